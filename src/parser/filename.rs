//! Release-name parser.
//!
//! Extracts season/episode numbers (or an air date), and the release
//! group from a filename or release string. Used for import
//! classification and for the `%RG` naming token. Parsers are tried in
//! order from the most to the least structured form.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// What a release name parsed into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRelease {
    pub title: Option<String>,
    pub season: Option<i32>,
    /// One entry per episode in the file; more than one for bundled
    /// multi-episode releases.
    pub episodes: Vec<i32>,
    /// Set instead of season/episodes for air-by-date releases.
    pub air_date: Option<NaiveDate>,
    pub group: Option<String>,
}

impl ParsedRelease {
    #[must_use]
    pub fn is_air_by_date(&self) -> bool {
        self.air_date.is_some()
    }
}

#[must_use]
pub fn parse_release(name: &str) -> Option<ParsedRelease> {
    let name = strip_extension(name);
    parse_season_episode(name)
        .or_else(|| parse_x_separated(name))
        .or_else(|| parse_air_by_date(name))
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("invalid regex pattern defined in code"))
}

fn strip_extension(name: &str) -> &str {
    static VIDEO_EXTENSIONS: [&str; 7] = ["mkv", "mp4", "avi", "m4v", "wmv", "mpg", "ts"];
    if let Some((stem, ext)) = name.rsplit_once('.')
        && VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    {
        return stem;
    }
    name
}

/// `Show.Name.S01E02.720p.HDTV.x264-GRP`, including bundled forms like
/// `S01E01E02` and `S01E01-02`.
fn parse_season_episode(name: &str) -> Option<ParsedRelease> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?ix)^(?P<title>.*?)[\ ._-]*
          s(?:eason[\ ._-]*)?(?P<season>\d{1,2})
          [\ ._-]*e(?P<episode>\d{1,3})
          (?P<extra>(?:[\ ._-]*(?:e|-)\d{1,3})*)
          (?P<rest>.*)$",
    );

    let caps = re.captures(name)?;
    let season = caps.name("season")?.as_str().parse().ok()?;
    let first: i32 = caps.name("episode")?.as_str().parse().ok()?;

    let mut episodes = vec![first];
    if let Some(extra) = caps.name("extra") {
        static EXTRA_RE: OnceLock<Regex> = OnceLock::new();
        let extra_re = get_regex(&EXTRA_RE, r"(?i)(?:e|-)(\d{1,3})");
        for m in extra_re.captures_iter(extra.as_str()) {
            if let Ok(n) = m[1].parse::<i32>()
                && !is_resolution_number(n)
            {
                episodes.push(n);
            }
        }
    }

    let rest = caps.name("rest").map_or("", |m| m.as_str());
    Some(ParsedRelease {
        title: clean_title(caps.name("title").map_or("", |m| m.as_str())),
        season: Some(season),
        episodes,
        air_date: None,
        group: extract_group(rest).or_else(|| extract_group(name)),
    })
}

/// Values that look like an episode number but are a resolution tag
/// sitting right after a dash.
const fn is_resolution_number(n: i32) -> bool {
    matches!(n, 480 | 576 | 720)
}

/// `Show.Name.1x02.HDTV-GRP`, bundled as `1x01x02` or `1x01-02`.
fn parse_x_separated(name: &str) -> Option<ParsedRelease> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?ix)^(?P<title>.*?)[\ ._-]*
          (?P<season>\d{1,2})x(?P<episode>\d{1,3})
          (?P<extra>(?:[x-]\d{1,3})*)
          (?P<rest>.*)$",
    );

    let caps = re.captures(name)?;
    let season = caps.name("season")?.as_str().parse().ok()?;
    let first: i32 = caps.name("episode")?.as_str().parse().ok()?;

    let mut episodes = vec![first];
    if let Some(extra) = caps.name("extra") {
        static EXTRA_RE: OnceLock<Regex> = OnceLock::new();
        let extra_re = get_regex(&EXTRA_RE, r"[x-](\d{1,3})");
        for m in extra_re.captures_iter(extra.as_str()) {
            if let Ok(n) = m[1].parse::<i32>()
                && !is_resolution_number(n)
            {
                episodes.push(n);
            }
        }
    }

    let rest = caps.name("rest").map_or("", |m| m.as_str());
    Some(ParsedRelease {
        title: clean_title(caps.name("title").map_or("", |m| m.as_str())),
        season: Some(season),
        episodes,
        air_date: None,
        group: extract_group(rest).or_else(|| extract_group(name)),
    })
}

/// `Show.Name.2011.03.09.HDTV.x264-GRP` for daily shows.
fn parse_air_by_date(name: &str) -> Option<ParsedRelease> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?x)^(?P<title>.*?)[\ ._-]+
          (?P<year>\d{4})[\ ._-](?P<month>\d{2})[\ ._-](?P<day>\d{2})
          (?P<rest>.*)$",
    );

    let caps = re.captures(name)?;
    let year = caps.name("year")?.as_str().parse().ok()?;
    let month = caps.name("month")?.as_str().parse().ok()?;
    let day = caps.name("day")?.as_str().parse().ok()?;
    let air_date = NaiveDate::from_ymd_opt(year, month, day)?;

    let rest = caps.name("rest").map_or("", |m| m.as_str());
    Some(ParsedRelease {
        title: clean_title(caps.name("title").map_or("", |m| m.as_str())),
        season: None,
        episodes: Vec::new(),
        air_date: Some(air_date),
        group: extract_group(rest).or_else(|| extract_group(name)),
    })
}

/// The group is the trailing `-GRP` token, unless it is a codec or
/// source tag that happens to sit there.
fn extract_group(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"-([A-Za-z0-9_]+)(?:\[[^\]]*\])?\s*$");

    let caps = re.captures(s)?;
    let group = caps[1].trim().to_string();
    if group.is_empty() || is_metadata_token(&group) {
        return None;
    }
    Some(group)
}

fn is_metadata_token(s: &str) -> bool {
    let upper = s.to_uppercase();
    [
        "X264", "X265", "H264", "H265", "HEVC", "XVID", "DIVX", "AAC", "AC3", "DTS", "MP3",
        "HDTV", "PDTV", "SDTV", "WEB", "WEBRIP", "BLURAY", "DVDRIP", "PROPER", "REPACK",
        "INTERNAL", "720P", "1080P", "2160P",
    ]
    .contains(&upper.as_str())
}

fn clean_title(raw: &str) -> Option<String> {
    let cleaned = raw
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim_end_matches('-').trim().to_string();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_sxxeyy() {
        let r = parse_release("Demo.Show.S01E02.720p.HDTV.x264-LOL.mkv").unwrap();
        assert_eq!(r.title.as_deref(), Some("Demo Show"));
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episodes, vec![2]);
        assert_eq!(r.group.as_deref(), Some("LOL"));
    }

    #[test]
    fn test_multi_episode_e_chain() {
        let r = parse_release("Demo.Show.S01E01E02.HDTV.x264-GRP").unwrap();
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episodes, vec![1, 2]);
    }

    #[test]
    fn test_multi_episode_dash_chain() {
        let r = parse_release("Demo Show - S02E03-04 - Title.mkv").unwrap();
        assert_eq!(r.season, Some(2));
        assert_eq!(r.episodes, vec![3, 4]);
    }

    #[test]
    fn test_x_separated() {
        let r = parse_release("Demo.Show.1x05.HDTV.XviD-GRP").unwrap();
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episodes, vec![5]);
        assert_eq!(r.group.as_deref(), Some("GRP"));
    }

    #[test]
    fn test_x_separated_multi() {
        let r = parse_release("Demo.Show.1x01x02.HDTV-GRP").unwrap();
        assert_eq!(r.episodes, vec![1, 2]);
    }

    #[test]
    fn test_air_by_date() {
        let r = parse_release("Daily.Show.2011.03.09.HDTV.x264-GRP.mkv").unwrap();
        assert_eq!(r.title.as_deref(), Some("Daily Show"));
        assert_eq!(r.air_date, NaiveDate::from_ymd_opt(2011, 3, 9));
        assert!(r.episodes.is_empty());
        assert!(r.is_air_by_date());
    }

    #[test]
    fn test_group_not_codec() {
        let r = parse_release("Demo.Show.S01E02.720p.HDTV-x264").unwrap();
        assert_eq!(r.group, None);
    }

    #[test]
    fn test_season_word_form() {
        let r = parse_release("Demo Show Season 1 E03").unwrap();
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episodes, vec![3]);
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_release("some random file"), None);
    }

    #[test]
    fn test_underscored() {
        let r = parse_release("Demo_Show_S01E02_720p-GRP").unwrap();
        assert_eq!(r.title.as_deref(), Some("Demo Show"));
        assert_eq!(r.episodes, vec![2]);
    }
}
