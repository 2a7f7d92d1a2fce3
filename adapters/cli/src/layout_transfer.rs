use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use path_defence_core::{Point, TowerKind, TowerView};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "path";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "path:v1";
/// Delimiter used to separate the prefix, level name and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of the towers placed on a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TowerLayoutSnapshot {
    /// Name of the level the towers were placed on.
    pub(crate) level: String,
    /// Towers composing the layout, in placement order.
    pub(crate) towers: Vec<TowerLayoutTower>,
}

impl TowerLayoutSnapshot {
    /// Captures the towers currently standing on `level`.
    pub(crate) fn capture(level: &str, towers: &TowerView) -> Self {
        Self {
            level: level.to_owned(),
            towers: towers
                .iter()
                .map(|tower| TowerLayoutTower {
                    kind: tower.kind,
                    position: tower.position,
                })
                .collect(),
        }
    }

    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableSnapshot {
            towers: self.towers.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{SNAPSHOT_HEADER}:{}:{encoded}", self.level))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let level = parts.next().ok_or(LayoutTransferError::MissingLevel)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }
        if level.trim().is_empty() {
            return Err(LayoutTransferError::MissingLevel);
        }

        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        Ok(Self {
            level: level.trim().to_owned(),
            towers: decoded.towers,
        })
    }
}

/// Tower description captured within a layout snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TowerLayoutTower {
    /// Type of tower represented by the snapshot.
    pub(crate) kind: TowerKind,
    /// Centre of the tower in world units.
    pub(crate) position: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableSnapshot {
    towers: Vec<TowerLayoutTower>,
}

/// Errors that can occur while encoding or decoding layout transfer strings.
#[derive(Debug, thiserror::Error)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("layout string was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    #[error("layout string is missing the prefix")]
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not name a level.
    #[error("layout string is missing the level name")]
    MissingLevel,
    /// The encoded snapshot did not include the payload segment.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be converted to or from JSON.
    #[error("could not process layout payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populated_layout_survives_transfer() {
        let snapshot = TowerLayoutSnapshot {
            level: "snow".to_owned(),
            towers: vec![
                TowerLayoutTower {
                    kind: TowerKind::Archer,
                    position: Point::new(180.0, 60.0),
                },
                TowerLayoutTower {
                    kind: TowerKind::Lightning,
                    position: Point::new(420.0, 240.0),
                },
            ],
        };

        let encoded = snapshot.encode().expect("snapshot encodes");
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:snow:")));

        let decoded = TowerLayoutSnapshot::decode(&encoded).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn foreign_prefixes_and_versions_are_rejected() {
        assert!(matches!(
            TowerLayoutSnapshot::decode("defence:v1:grass:e30"),
            Err(LayoutTransferError::InvalidPrefix(prefix)) if prefix == "defence"
        ));
        assert!(matches!(
            TowerLayoutSnapshot::decode("path:v2:grass:e30"),
            Err(LayoutTransferError::UnsupportedVersion(version)) if version == "v2"
        ));
    }

    #[test]
    fn truncated_strings_report_the_missing_field() {
        assert!(matches!(
            TowerLayoutSnapshot::decode("   "),
            Err(LayoutTransferError::EmptyPayload)
        ));
        assert!(matches!(
            TowerLayoutSnapshot::decode("path"),
            Err(LayoutTransferError::MissingVersion)
        ));
        assert!(matches!(
            TowerLayoutSnapshot::decode("path:v1:grass"),
            Err(LayoutTransferError::MissingPayload)
        ));
        assert!(matches!(
            TowerLayoutSnapshot::decode("path:v1::e30"),
            Err(LayoutTransferError::MissingLevel)
        ));
    }

    #[test]
    fn corrupt_payloads_are_rejected() {
        assert!(matches!(
            TowerLayoutSnapshot::decode("path:v1:grass:!!!"),
            Err(LayoutTransferError::InvalidEncoding(_))
        ));
        // "e30" is `{}`, which lacks the tower list.
        assert!(matches!(
            TowerLayoutSnapshot::decode("path:v1:grass:e30"),
            Err(LayoutTransferError::InvalidPayload(_))
        ));
    }
}
