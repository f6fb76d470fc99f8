use crate::traits::ClusterPair;
use markerdb_core::{MarkerDbError, MarkerDbResult};

/// Parse one `member<TAB>representative` line of `smafa cluster` output.
/// Anything other than exactly two non-empty fields is malformed.
pub fn parse_cluster_line(line: &str) -> MarkerDbResult<ClusterPair> {
    let fields: Vec<&str> = line.split('\t').collect();
    match fields[..] {
        [member, representative] if !member.is_empty() && !representative.is_empty() => {
            Ok(ClusterPair::new(member, representative))
        }
        _ => Err(MarkerDbError::MalformedClusterOutput(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_fields() {
        assert_eq!(
            parse_cluster_line("ACGT\tACGA").unwrap(),
            ClusterPair::new("ACGT", "ACGA")
        );
    }

    #[test]
    fn test_wrong_field_counts() {
        for line in ["", "ACGT", "ACGT\tACGA\tx", "ACGT ACGA", "\tACGA", "ACGT\t"] {
            assert!(
                matches!(parse_cluster_line(line), Err(MarkerDbError::MalformedClusterOutput(_))),
                "{:?} should be rejected",
                line
            );
        }
    }
}
