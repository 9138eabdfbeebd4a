//! Upstream route builders

/// Versioned upstream routes
///
/// Kept in one place so route versions can be bumped without hunting
/// through the endpoint code.
pub struct Paths;

impl Paths {
    /// Server status: player count and VIP flag
    pub const STATUS: &'static str = "/v1/status/";

    /// A single killmail: `/v1/killmails/123/abc/`
    pub fn killmail(id: u64, hash: &str) -> String {
        format!("/v1/killmails/{}/{}/", id, hash)
    }

    pub fn character(id: u64) -> String {
        format!("/v5/characters/{}/", id)
    }

    pub fn corporation(id: u64) -> String {
        format!("/v5/corporations/{}/", id)
    }

    pub fn alliance(id: u64) -> String {
        format!("/v4/alliances/{}/", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(Paths::killmail(123, "abc"), "/v1/killmails/123/abc/");
        assert_eq!(Paths::character(90000001), "/v5/characters/90000001/");
        assert_eq!(Paths::STATUS, "/v1/status/");
    }
}
