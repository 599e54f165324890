//! Endpoint paths and query encodings of the AppFlowy API.
//!
//! Workspace and database ids are percent-encoded as path segments. Row ids
//! travel as a comma-separated list in the `ids` query parameter, and the
//! "updated after" filter uses second precision with a literal `Z`.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that must be percent-encoded in a path segment.
const SEGMENT_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

/// Password-grant token endpoint.
pub const TOKEN: &str = "/gotrue/token";

/// Workspace listing.
pub const WORKSPACES: &str = "/api/workspace";

/// Percent-encode a single path segment.
///
/// # Examples
///
/// ```
/// use appflowy_connector_client::paths::encode_segment;
///
/// let id = "9eebea03-3ed5-4298-86b2-a7f77856d48b";
/// assert_eq!(encode_segment(id), id);
/// assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
/// ```
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT_ESCAPE).to_string()
}

/// Databases of a workspace.
#[must_use]
pub fn databases(workspace_id: &str) -> String {
    format!("{WORKSPACES}/{}/database", encode_segment(workspace_id))
}

/// Base path of a database.
fn database(workspace_id: &str, database_id: &str) -> String {
    format!("{}/{}", databases(workspace_id), encode_segment(database_id))
}

/// Field definitions of a database.
#[must_use]
pub fn fields(workspace_id: &str, database_id: &str) -> String {
    format!("{}/fields", database(workspace_id, database_id))
}

/// Row listing, creation (POST), and upsert (PUT).
#[must_use]
pub fn rows(workspace_id: &str, database_id: &str) -> String {
    format!("{}/row", database(workspace_id, database_id))
}

/// Rows updated after a point in time.
#[must_use]
pub fn rows_updated(workspace_id: &str, database_id: &str) -> String {
    format!("{}/row/updated", database(workspace_id, database_id))
}

/// Row details for a batch of ids.
#[must_use]
pub fn row_detail(workspace_id: &str, database_id: &str) -> String {
    format!("{}/row/detail", database(workspace_id, database_id))
}

/// Format the `after` query value, e.g. `2024-05-01T10:00:00Z`.
#[must_use]
pub fn format_after(after: DateTime<Utc>) -> String {
    after.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Join row ids into the `ids` query value.
#[must_use]
pub fn join_ids(ids: &[String]) -> String {
    ids.join(",")
}

/// Split a comma-separated id list, dropping blanks.
#[must_use]
pub fn split_ids(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn row_paths() {
        assert_eq!(databases("ws"), "/api/workspace/ws/database");
        assert_eq!(fields("ws", "db"), "/api/workspace/ws/database/db/fields");
        assert_eq!(rows("ws", "db"), "/api/workspace/ws/database/db/row");
        assert_eq!(
            rows_updated("ws", "db"),
            "/api/workspace/ws/database/db/row/updated"
        );
        assert_eq!(
            row_detail("ws", "db"),
            "/api/workspace/ws/database/db/row/detail"
        );
    }

    #[test]
    fn ids_are_escaped_in_paths() {
        assert_eq!(databases("w s/1"), "/api/workspace/w%20s%2F1/database");
    }

    #[test]
    fn after_has_second_precision_and_z_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 7).unwrap()
            + chrono::Duration::milliseconds(450);
        assert_eq!(format_after(at), "2024-05-01T10:00:07Z");
    }

    #[test]
    fn id_lists() {
        let ids = split_ids(" a, b,,c ");
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(join_ids(&ids), "a,b,c");
        assert!(split_ids("").is_empty());
    }
}
