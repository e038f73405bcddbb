pub mod composite;
pub mod definition;
pub mod profile;

pub use composite::{Status, decode, decode_status, encode, status_from_name};
pub use definition::Quality;
pub use profile::{Overview, QualityPreference};

/// Classifies a filename or release name into a [`Quality`] by source and
/// resolution tags. Rules are checked in order and the first match wins;
/// a name matching nothing is `Unknown`.
#[must_use]
pub fn classify_filename(name: &str) -> Quality {
    let lower = name.to_lowercase();
    let has = |tags: &[&str]| tags.iter().any(|t| lower.contains(t));

    if has(&["2160p", "4k", "uhd"]) {
        return Quality::Uhd4k;
    }
    if has(&["bluray", "blu-ray", "bdrip", "brrip", "bdmv"]) {
        return Quality::HdBluRay;
    }
    if has(&["1080p", "1080i"]) {
        return Quality::Hd1080p;
    }
    if has(&["720p"]) {
        return Quality::Hd720p;
    }
    if has(&["dvdrip", "dvd-rip", ".dvd.", " dvd "]) || lower.ends_with("dvd") {
        return Quality::SdDvd;
    }
    if has(&["hdtv", "pdtv", "sdtv", "hr.ws.pdtv", "web-dl", "webdl", "webrip", "web."]) {
        return Quality::SdTv;
    }
    Quality::Unknown
}

/// Looser fallback used only when [`classify_filename`] returned
/// `Unknown`. Extension heuristics: never stricter than SD TV unless the
/// container itself is a strong HD signal.
#[must_use]
pub fn assume_quality(name: &str) -> Quality {
    let lower = name.to_lowercase();
    if lower.ends_with(".mkv") {
        // mkv containers are overwhelmingly HD releases
        return Quality::Hd720p;
    }
    if lower.ends_with(".avi") || lower.ends_with(".ts") {
        return Quality::SdTv;
    }
    Quality::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_resolution_tags() {
        assert_eq!(classify_filename("Show.S01E01.720p.HDTV.x264-GRP"), Quality::Hd720p);
        assert_eq!(classify_filename("Show.S01E01.1080p.WEB-DL.H264"), Quality::Hd1080p);
        assert_eq!(classify_filename("Show.S01E01.2160p.WEB.x265"), Quality::Uhd4k);
    }

    #[test]
    fn test_classify_source_tags() {
        assert_eq!(classify_filename("Show.S01E01.BluRay.x264"), Quality::HdBluRay);
        assert_eq!(classify_filename("show.s01e01.dvdrip.xvid"), Quality::SdDvd);
        assert_eq!(classify_filename("Show.S01E01.HDTV.XviD-GRP"), Quality::SdTv);
    }

    #[test]
    fn test_classify_first_match_wins() {
        // bluray outranks the bare 1080p tag further along the name
        assert_eq!(
            classify_filename("Show.S01E01.1080p.BluRay.x264"),
            Quality::HdBluRay
        );
    }

    #[test]
    fn test_classify_no_match() {
        assert_eq!(classify_filename("Show - 1x01 - Pilot"), Quality::Unknown);
    }

    #[test]
    fn test_assume_quality() {
        assert_eq!(assume_quality("Show - 1x01 - Pilot.avi"), Quality::SdTv);
        assert_eq!(assume_quality("Show - 1x01 - Pilot.mkv"), Quality::Hd720p);
        assert_eq!(assume_quality("Show - 1x01 - Pilot.mp4"), Quality::Unknown);
    }
}
