use md5::{Digest, Md5};

/// Compute the content key of a payload: the lowercase hex MD5 digest.
///
/// Collisions are not handled; two payloads with the same digest share a blob.
pub fn compute_key(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(compute_key(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            compute_key(b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn deterministic_for_identical_bytes() {
        let payload = vec![7u8; 40_000];
        let first = compute_key(&payload);
        let second = compute_key(&payload.clone());
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(first, compute_key(&payload[1..]));
    }
}
