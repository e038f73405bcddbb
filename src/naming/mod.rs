//! Naming pattern engine.
//!
//! Compiles a user naming pattern plus episode metadata into a relative
//! directory + filename. Handles multi-episode (bundled) files under the
//! numbering policies of [`MultiEpStyle`]. The engine is pure: it never
//! touches the filesystem, it only computes paths.

use crate::config::NamingConfig;
use crate::parser::filename as release_parser;
use crate::quality::Quality;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

/// Tag used in the generic release-name fallback when an episode has no
/// recorded release name.
const GENERIC_GROUP: &str = "TELARR";

/// How the episode numbers of a bundled multi-episode file are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MultiEpStyle {
    /// Restate the season token for every episode: `S01E01-S01E02`.
    Duplicate,
    /// Append every further episode with a `-` joiner: `S01E01-E02`.
    #[default]
    Extend,
    /// Like `Extend` but only the last bundled episode: `S01E01-E03`.
    LimitedExtend,
    /// Like `LimitedExtend`, forcing a literal `E` before the number even
    /// when the pattern's own episode token has none: `1x01-E03`.
    LimitedExtendEPrefixed,
    /// Repeat only the surrounding separator: `S01E01 E02`.
    SeparatedRepeat,
}

/// Read-only metadata of one episode as the engine sees it.
#[derive(Debug, Clone)]
pub struct NamingView {
    pub show_name: String,
    pub season: i32,
    pub episode: i32,
    pub title: String,
    pub quality: Quality,
    pub airdate: NaiveDate,
    pub release_name: String,
    pub is_proper: bool,
}

/// The primary episode of a file plus the related episodes bundled into
/// the same file.
#[derive(Debug, Clone)]
pub struct NamingContext {
    pub primary: NamingView,
    pub related: Vec<NamingView>,
    pub air_by_date: bool,
}

impl NamingContext {
    #[must_use]
    pub fn single(primary: NamingView, air_by_date: bool) -> Self {
        Self {
            primary,
            related: Vec::new(),
            air_by_date,
        }
    }

    /// Related episodes in ascending episode order, the order they are
    /// rendered in.
    fn related_sorted(&self) -> Vec<&NamingView> {
        let mut eps: Vec<&NamingView> = self.related.iter().collect();
        eps.sort_by_key(|e| e.episode);
        eps
    }

    /// Title to use for the file. Titles of the form `"<base> (<n>)"`
    /// sharing one base collapse to `<base>`; anything else joins with
    /// `" & "`.
    fn combined_title(&self) -> String {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^(.*) \(\d{1,2}\)$").expect("invalid multi-name regex")
        });

        let related = self.related_sorted();
        if related.is_empty() {
            return self.primary.title.clone();
        }

        let mut shared_base: Option<&str> = None;
        let mut single_name = true;
        for title in std::iter::once(self.primary.title.as_str())
            .chain(related.iter().map(|e| e.title.as_str()))
        {
            let Some(caps) = re.captures(title) else {
                single_name = false;
                break;
            };
            let base = caps.get(1).map_or("", |m| m.as_str());
            match shared_base {
                None => shared_base = Some(base),
                Some(prev) if prev == base => {}
                Some(_) => {
                    single_name = false;
                    break;
                }
            }
        }

        if single_name && let Some(base) = shared_base {
            return base.to_string();
        }

        let mut combined = self.primary.title.clone();
        for rel in related {
            combined.push_str(" & ");
            combined.push_str(&rel.title);
        }
        combined
    }
}

/// Strips characters that are illegal in path components, collapsing the
/// leftover whitespace.
#[must_use]
pub fn sanitize_path_component(name: &str) -> String {
    name.replace(
        ['/', '\\', ':', '*', '?', '"', '<', '>', '|'],
        " ",
    )
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Scene-style dotted form of a name: punctuation dropped, separators
/// become dots.
fn dot(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dot = true;
    for c in name.chars() {
        if c == ' ' || c == '-' {
            if !last_dot {
                out.push('.');
                last_dot = true;
            }
        } else if c.is_alphanumeric() || c == '.' {
            out.push(c);
            last_dot = c == '.';
        }
    }
    out.trim_end_matches('.').to_string()
}

fn us(name: &str) -> String {
    name.replace([' ', '-'], "_")
}

fn strip_year(name: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\(\d{4}\)$").expect("invalid year regex"));
    re.replace(name, "").trim_end().to_string()
}

fn strip_nzb(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.ends_with(".nzb") {
        name[..name.len() - 4].to_string()
    } else {
        name.to_string()
    }
}

/// Token substitution map for the primary episode, uppercase keys only;
/// the lowercase form of each token maps to the lowercased value.
fn replace_map(ctx: &NamingContext, cfg: &NamingConfig) -> Vec<(&'static str, String)> {
    let p = &ctx.primary;

    let show_name = if cfg.strip_year {
        strip_year(&p.show_name)
    } else {
        p.show_name.clone()
    };
    let ep_name = ctx.combined_title();
    let quality_name = p.quality.name().to_string();
    let release_name = strip_nzb(&p.release_name);
    let release_group = release_parser::parse_release(&release_name)
        .and_then(|r| r.group)
        .unwrap_or_default();
    let airdate = p.airdate.format("%Y-%m-%d").to_string();

    vec![
        ("%SN", show_name.clone()),
        ("%S.N", dot(&show_name)),
        ("%S_N", us(&show_name)),
        ("%EN", ep_name.clone()),
        ("%E.N", dot(&ep_name)),
        ("%E_N", us(&ep_name)),
        ("%QN", quality_name.clone()),
        ("%Q.N", dot(&quality_name)),
        ("%Q_N", us(&quality_name)),
        ("%S", p.season.to_string()),
        ("%0S", format!("{:02}", p.season)),
        ("%E", p.episode.to_string()),
        ("%0E", format!("{:02}", p.episode)),
        ("%RN", release_name),
        ("%RG", release_group),
        ("%AD", airdate.replace('-', " ")),
        ("%A.D", airdate.replace('-', ".")),
        ("%A_D", airdate.replace('-', "_")),
        ("%A-D", airdate.clone()),
        ("%Y", p.airdate.year().to_string()),
        ("%M", p.airdate.month().to_string()),
        ("%D", p.airdate.day().to_string()),
        ("%0M", format!("{:02}", p.airdate.month())),
        ("%0D", format!("{:02}", p.airdate.day())),
        ("%RT", if p.is_proper { "PROPER".to_string() } else { String::new() }),
    ]
}

/// Substitutes every simple token, the uppercase form then the lowercase
/// form, sanitizing each value for filesystem safety. Longer tokens go
/// first so `%SN` never loses its tail to `%S`.
fn apply_tokens(pattern: &str, map: &[(&'static str, String)]) -> String {
    let mut keys: Vec<usize> = (0..map.len()).collect();
    keys.sort_by(|&a, &b| map[b].0.cmp(map[a].0));

    let mut result = pattern.to_string();
    for idx in keys {
        let (token, value) = &map[idx];
        let clean = sanitize_path_component(value);
        result = result.replace(token, &clean);
        result = result.replace(&token.to_lowercase(), &clean.to_lowercase());
    }
    result
}

// The season/episode scan must not look inside the name-bearing tokens
// (%SN, %EN and friends contain an S or an E the pair regex would bite
// on). The regex crate has no lookaround, so those tokens are swapped
// for private-use sentinels around the scan.
const PROTECTED_TOKENS: [(&str, &str); 12] = [
    ("%S.N", "\u{e000}"),
    ("%S_N", "\u{e001}"),
    ("%SN", "\u{e002}"),
    ("%E.N", "\u{e003}"),
    ("%E_N", "\u{e004}"),
    ("%EN", "\u{e005}"),
    ("%s.n", "\u{e006}"),
    ("%s_n", "\u{e007}"),
    ("%sn", "\u{e008}"),
    ("%e.n", "\u{e009}"),
    ("%e_n", "\u{e00a}"),
    ("%en", "\u{e00b}"),
];

fn protect_name_tokens(segment: &str) -> String {
    let mut out = segment.to_string();
    for (token, sentinel) in PROTECTED_TOKENS {
        out = out.replace(token, sentinel);
    }
    out
}

fn restore_name_tokens(segment: &str) -> String {
    let mut out = segment.to_string();
    for (token, sentinel) in PROTECTED_TOKENS {
        out = out.replace(sentinel, token);
    }
    out
}

fn season_ep_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?P<pre>[ _.\-]*)(?P<season>(?:s(?:eason|eries)?\s*)?%0?S)(?P<sep>.*?)(?P<ep>E?%0?E)(?P<post>[ _.\-]*)",
        )
        .expect("invalid season/episode pair regex")
    })
}

fn ep_only_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)E?%0?E").expect("invalid episode regex"))
}

/// Renders the literal text of a season or episode token with concrete
/// numbers, preserving any surrounding literal characters the token
/// carried (the `E` of `E%0E`, the `Season ` of `Season %0S`).
fn render_numbers(text: &str, season: i32, episode: i32) -> String {
    let pairs = [
        ("%0S", format!("{season:02}")),
        ("%0E", format!("{episode:02}")),
        ("%S", season.to_string()),
        ("%E", episode.to_string()),
    ];
    let mut out = text.to_string();
    for (token, value) in pairs {
        out = out.replace(token, &value);
        out = out.replace(&token.to_lowercase(), &value);
    }
    out
}

/// Builds the expanded episode-number string for the primary episode plus
/// the related episodes under the configured policy.
fn build_ep_string(
    ctx: &NamingContext,
    multi: MultiEpStyle,
    season_text: &str,
    ep_sep: &str,
    ep_token: &str,
    block_sep: &str,
) -> String {
    let primary = &ctx.primary;
    let related = ctx.related_sorted();

    let mut ep_string = render_numbers(ep_token, primary.season, primary.episode);

    // the appended number token without any literal E the pattern carried
    let bare_token = ep_token.trim_start_matches(['E', 'e']);

    for (idx, rel) in related.iter().enumerate() {
        let is_last = idx + 1 == related.len();
        match multi {
            MultiEpStyle::Duplicate => {
                // restate the season token; it is filled with the
                // primary's season in the final substitution pass
                ep_string.push_str(block_sep);
                ep_string.push_str(season_text);
                ep_string.push_str(ep_sep);
                ep_string.push_str(&render_numbers(ep_token, primary.season, rel.episode));
            }
            MultiEpStyle::SeparatedRepeat => {
                ep_string.push_str(block_sep);
                ep_string.push_str(ep_sep);
                ep_string.push_str(&render_numbers(ep_token, primary.season, rel.episode));
            }
            MultiEpStyle::Extend => {
                ep_string.push('-');
                ep_string.push_str(&render_numbers(ep_token, primary.season, rel.episode));
            }
            MultiEpStyle::LimitedExtend => {
                if is_last {
                    ep_string.push('-');
                    ep_string.push_str(&render_numbers(ep_token, primary.season, rel.episode));
                }
            }
            MultiEpStyle::LimitedExtendEPrefixed => {
                if is_last {
                    ep_string.push_str("-E");
                    ep_string.push_str(&render_numbers(bare_token, primary.season, rel.episode));
                }
            }
        }
    }

    ep_string
}

/// Expands the season/episode numbering inside one path segment. Segments
/// without any episode token pass through unchanged.
fn format_segment(ctx: &NamingContext, segment: &str, multi: MultiEpStyle) -> String {
    let protected = protect_name_tokens(segment);

    if season_ep_regex().is_match(&protected) {
        let replaced = season_ep_regex().replace_all(&protected, |caps: &regex::Captures| {
            let pre = caps.name("pre").map_or("", |m| m.as_str());
            let season_text = caps.name("season").map_or("", |m| m.as_str());
            let ep_sep = caps.name("sep").map_or("", |m| m.as_str());
            let ep_token = caps.name("ep").map_or("", |m| m.as_str());
            let post = caps.name("post").map_or("", |m| m.as_str());

            let block_sep = if !pre.is_empty() {
                pre
            } else if !post.is_empty() {
                post
            } else {
                " "
            };

            let ep_string = build_ep_string(ctx, multi, season_text, ep_sep, ep_token, block_sep);
            format!("{pre}{season_text}{ep_sep}{ep_string}{post}")
        });
        return restore_name_tokens(&replaced);
    }

    if ep_only_regex().is_match(&protected) {
        // no season token in the segment: episodes chain with a dash
        let replaced = ep_only_regex().replace_all(&protected, |caps: &regex::Captures| {
            let ep_token = caps.get(0).map_or("", |m| m.as_str());
            let style = match multi {
                MultiEpStyle::LimitedExtend | MultiEpStyle::LimitedExtendEPrefixed => multi,
                _ => MultiEpStyle::Extend,
            };
            build_ep_string(ctx, style, "", "", ep_token, "")
        });
        return restore_name_tokens(&replaced);
    }

    segment.to_string()
}

/// Compiles a pattern (or sub-pattern) against the context.
#[must_use]
pub fn format_pattern(ctx: &NamingContext, cfg: &NamingConfig, pattern: &str) -> String {
    let map = replace_map(ctx, cfg);
    let mut result = pattern.to_string();

    // no release name recorded: substitute a generic facsimile before the
    // number expansion, since the fallback itself carries number tokens
    let release_empty = map
        .iter()
        .find(|(token, _)| *token == "%RN")
        .is_some_and(|(_, v)| v.is_empty());
    if release_empty {
        if ctx.air_by_date {
            result = result.replace("%RN", &format!("%S.N.%A.D.%E.N-{GENERIC_GROUP}"));
            result = result.replace("%rn", &format!("%s.n.%a.d.%e.n-{}", GENERIC_GROUP.to_lowercase()));
        } else {
            result = result.replace("%RN", &format!("%S.N.S%0SE%0E.%E.N-{GENERIC_GROUP}"));
            result = result.replace("%rn", &format!("%s.n.s%0se%0e.%e.n-{}", GENERIC_GROUP.to_lowercase()));
        }
        result = result.replace("%RG", GENERIC_GROUP);
        result = result.replace("%rg", &GENERIC_GROUP.to_lowercase());
        debug!(pattern = %result, "no release name, using generic fallback");
    }

    let compiled: Vec<String> = result
        .split(['/', '\\'])
        .map(|segment| format_segment(ctx, segment, cfg.multi_ep))
        .collect();

    apply_tokens(&compiled.join("/"), &map)
}

fn select_pattern<'a>(ctx: &NamingContext, cfg: &'a NamingConfig) -> &'a str {
    // the air-by-date pattern only applies to single-episode files
    if ctx.air_by_date && cfg.custom_abd && ctx.related.is_empty() {
        &cfg.abd_pattern
    } else {
        &cfg.pattern
    }
}

/// The filename part of the compiled pattern (its last path segment).
#[must_use]
pub fn formatted_filename(ctx: &NamingContext, cfg: &NamingConfig) -> String {
    let pattern = select_pattern(ctx, cfg);
    let last = pattern.split(['/', '\\']).next_back().unwrap_or(pattern);
    format_pattern(ctx, cfg, last)
}

/// The directory part of the compiled pattern; empty for a single-segment
/// (flat) pattern.
#[must_use]
pub fn formatted_dir(ctx: &NamingContext, cfg: &NamingConfig) -> String {
    let pattern = select_pattern(ctx, cfg);
    let groups: Vec<&str> = pattern.split(['/', '\\']).collect();
    if groups.len() == 1 {
        return String::new();
    }
    format_pattern(ctx, cfg, &groups[..groups.len() - 1].join("/"))
}

/// Where the episode file should live, relative to the show directory.
/// A show may force flat layout; the global force-folders override wins.
#[must_use]
pub fn proper_path(ctx: &NamingContext, cfg: &NamingConfig, flatten_folders: bool) -> PathBuf {
    let filename = formatted_filename(ctx, cfg);
    if flatten_folders && !cfg.force_folders {
        return PathBuf::from(filename);
    }
    let dir = formatted_dir(ctx, cfg);
    if dir.is_empty() {
        PathBuf::from(filename)
    } else {
        PathBuf::from(dir).join(filename)
    }
}
