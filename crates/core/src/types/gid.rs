//! Shopify global id (GID) helpers.

/// Extract the short id from a GID.
///
/// `gid://shopify/Product/123` becomes `123`. Strings without a `/` are
/// returned unchanged, so an absent GID (`""`) stays empty.
#[must_use]
pub fn gid_to_id(gid: &str) -> &str {
    gid.rsplit_once('/').map_or(gid, |(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gid_to_id() {
        assert_eq!(gid_to_id("gid://shopify/Location/7788"), "7788");
        assert_eq!(gid_to_id("gid://shopify/LineItem/1?x=1"), "1?x=1");
    }

    #[test]
    fn test_gid_to_id_without_slash() {
        assert_eq!(gid_to_id("123"), "123");
        assert_eq!(gid_to_id(""), "");
    }
}
