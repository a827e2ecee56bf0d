use serde::{Deserialize, Serialize};

/// A file already present at the destination, as reported by list/find.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    pub id: String,
    pub size: u64,
}

/// One part the destination has already committed under a resume identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommittedPart {
    pub part_no: u32,
    pub part_id: String,
    pub salt: String,
}

/// Destination-held record of committed parts for one resume identifier.
/// The engine only reads and extends it; it never owns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub parts: Vec<CommittedPart>,
}

impl ResumeRecord {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn contains(&self, part_no: u32) -> bool {
        self.parts.iter().any(|p| p.part_no == part_no)
    }
}

/// Side-channel parameters of one part upload. The part bytes travel as the
/// request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUpload {
    pub part_name: String,
    pub file_name: String,
    pub part_no: u32,
    pub encrypted: bool,
    pub channel_id: String,
}

/// What the destination returns for a successfully stored part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartReceipt {
    pub part_id: String,
    pub part_no: u32,
    pub salt: String,
    pub channel_id: String,
}

/// Reference to a committed part inside a create-file request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRef {
    pub id: String,
    pub salt: String,
}

/// Commit request: the destination assembles the final object from the
/// ordered part references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFile {
    pub name: String,
    pub mime_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub parts: Vec<PartRef>,
    pub size: u64,
    pub path: String,
    pub encrypted: bool,
    pub channel_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_record_contains() {
        let record = ResumeRecord {
            channel_id: Some("ch-1".into()),
            parts: vec![
                CommittedPart {
                    part_no: 1,
                    part_id: "p-1".into(),
                    salt: "s-1".into(),
                },
                CommittedPart {
                    part_no: 3,
                    part_id: "p-3".into(),
                    salt: "s-3".into(),
                },
            ],
        };

        assert!(record.contains(1));
        assert!(!record.contains(2));
        assert!(record.contains(3));
        assert!(!record.is_empty());
        assert!(ResumeRecord::empty().is_empty());
    }

    #[test]
    fn test_create_file_wire_shape() {
        let request = CreateFile {
            name: "report.pdf".into(),
            mime_type: "application/pdf".into(),
            kind: "file".into(),
            parts: vec![PartRef {
                id: "p-1".into(),
                salt: "s-1".into(),
            }],
            size: 42,
            path: "/docs".into(),
            encrypted: false,
            channel_id: "ch-1".into(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["mimeType"], "application/pdf");
        assert_eq!(json["channelId"], "ch-1");
        assert_eq!(json["parts"][0]["id"], "p-1");
    }
}
