//! Upstream-coupling constants for WBI signing and the space feed request.
//!
//! These values are dictated by the upstream web client and change when it
//! does. Algorithm code only refers to them by name.

/// Byte positions selected from `img_key + sub_key` to build the mixin key.
pub const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

pub const MIXIN_KEY_LEN: usize = 32;

/// Timestamp parameter injected before signing.
pub const TIMESTAMP_PARAM: &str = "wts";

/// Signature parameter appended after signing.
pub const SIGNATURE_PARAM: &str = "w_rid";

/// Key fragment URLs end in this suffix, e.g. `.../7cd0...077c.png`.
pub const KEY_FRAGMENT_SUFFIX: &str = ".png";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const ACCEPT_JSON: &str = "application/json, text/plain, */*";

pub const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

pub const SESSION_COOKIE: &str = "SESSDATA";

/// Fixed parameters of the space feed request besides `host_mid`.
///
/// The `dm_*` fields are anti-automation fingerprints (base64 of a WebGL
/// renderer string) that upstream expects to see from a real browser.
pub const FEED_STATIC_PARAMS: &[(&str, &str)] = &[
    ("platform", "web"),
    ("web_location", "0.0"),
    ("dm_img_list", "[]"),
    ("dm_img_str", "V2ViR0wgMS4wIChPcGVuR0wgRVMgMi4wIENocm9taXVtKQ"),
    (
        "dm_cover_img_str",
        "QU5HTEUgKEFNRCwgQU1EIFJhZGVvbiA3ODBNIEdyYXBoaWNzICgweDAwMDAxNUJGKSBEaXJlY3QzRDExIHZzXzVfMCBwc181XzAsIEQzRDExKUdvb2dsZSBJbmMuIChBTU",
    ),
    (
        "features",
        "itemOpusStyle,listOnlyfans,opusBigCover,onlyfansVote,forwardListHidden,decorationCard,commentsNewVersion,onlyfansAssetsV2,ugcDelete,onlyfansQaCard,avatarAutoTheme,sunflowerStyle,cardsEnhance,eva3CardOpus,eva3CardVideo,eva3CardComment,eva3CardUser",
    ),
];

/// Subject id parameter of the space feed request.
pub const FEED_SUBJECT_PARAM: &str = "host_mid";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enc_tab_is_a_permutation() {
        let mut seen = [false; 64];
        for &i in MIXIN_KEY_ENC_TAB.iter() {
            assert!(i < 64);
            assert!(!seen[i], "index {i} appears twice");
            seen[i] = true;
        }
    }
}
