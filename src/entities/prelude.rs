pub use super::tv_episode::Entity as TvEpisode;
pub use super::tv_show::Entity as TvShow;
