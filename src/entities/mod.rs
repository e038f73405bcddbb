pub mod prelude;
pub mod tv_episode;
pub mod tv_show;
