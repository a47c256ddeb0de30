//! Shareable state and its content hash
//!
//! Both grid and multi-track configurations reduce to the same normalized
//! form: a row/column count and a map from cell key (`"{row}-{col}"`) to
//! URL. Transient UI flags never reach that form, so they never affect the
//! hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::error::{ShareError, ShareResult};

/// Which page a share reproduces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShareKind {
    Grid,
    MultiTrack,
}

impl ShareKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::MultiTrack => "multi-track",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "grid" => Some(Self::Grid),
            "multi-track" => Some(Self::MultiTrack),
            _ => None,
        }
    }

    /// Path segment in front of `/share/{id}`
    pub fn url_prefix(&self) -> &'static str {
        match self {
            Self::Grid => "",
            Self::MultiTrack => "/multi-track",
        }
    }
}

/// One grid cell as the dashboard holds it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub url: String,
    #[serde(default)]
    pub is_editing: bool,
}

impl CellData {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_editing: false,
        }
    }
}

/// Grid layout submitted for sharing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
    pub rows: u32,
    pub cols: u32,
    #[serde(default)]
    pub cell_data: BTreeMap<String, CellData>,
}

impl GridState {
    /// Normalized content, validated against the grid dimensions
    pub fn content(&self) -> ShareResult<ShareContent> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ShareError::InvalidState(format!(
                "grid must have at least one row and column, got {}x{}",
                self.rows, self.cols
            )));
        }

        for key in self.cell_data.keys() {
            match parse_cell_key(key) {
                Some((row, col)) if row < self.rows && col < self.cols => {}
                _ => {
                    return Err(ShareError::InvalidState(format!(
                        "cell key {:?} is outside a {}x{} grid",
                        key, self.rows, self.cols
                    )))
                }
            }
        }

        Ok(ShareContent {
            rows: self.rows,
            cols: self.cols,
            cells: self
                .cell_data
                .iter()
                .map(|(key, cell)| (key.clone(), cell.url.clone()))
                .collect(),
        })
    }
}

/// Athlete links submitted for a multi-track share
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiTrackState {
    pub urls: Vec<String>,
}

impl MultiTrackState {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    /// One cell per URL in a single column, keyed `"{index}-0"`
    pub fn content(&self) -> ShareResult<ShareContent> {
        if self.urls.is_empty() {
            return Err(ShareError::InvalidState(
                "multi-track share needs at least one URL".to_string(),
            ));
        }

        Ok(ShareContent {
            rows: self.urls.len() as u32,
            cols: 1,
            cells: self
                .urls
                .iter()
                .enumerate()
                .map(|(index, url)| (format!("{}-0", index), url.clone()))
                .collect(),
        })
    }
}

/// Normalized share content; the only input to the state hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareContent {
    pub rows: u32,
    pub cols: u32,
    pub cells: BTreeMap<String, String>,
}

impl ShareContent {
    /// Canonical JSON: `{"rows":R,"cols":C,"cells":{...}}` with sorted keys
    pub fn canonical_json(&self) -> ShareResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Hex SHA-256 of the canonical JSON
    pub fn state_hash(&self) -> ShareResult<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_json()?.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Split a `"{row}-{col}"` cell key
pub fn parse_cell_key(key: &str) -> Option<(u32, u32)> {
    let (row, col) = key.split_once('-')?;
    Some((row.parse().ok()?, col.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cells: &[(&str, &str)]) -> GridState {
        GridState {
            rows: 2,
            cols: 2,
            cell_data: cells
                .iter()
                .map(|(k, url)| (k.to_string(), CellData::new(*url)))
                .collect(),
        }
    }

    #[test]
    fn test_hash_ignores_key_order() {
        let json_a = r#"{"rows":2,"cols":2,"cellData":{"0-0":{"url":"https://a.example"},"1-1":{"url":"https://b.example"}}}"#;
        let json_b = r#"{"rows":2,"cols":2,"cellData":{"1-1":{"url":"https://b.example"},"0-0":{"url":"https://a.example"}}}"#;

        let a: GridState = serde_json::from_str(json_a).unwrap();
        let b: GridState = serde_json::from_str(json_b).unwrap();

        assert_eq!(
            a.content().unwrap().state_hash().unwrap(),
            b.content().unwrap().state_hash().unwrap()
        );
    }

    #[test]
    fn test_hash_ignores_editing_flag() {
        let plain = grid(&[("0-0", "https://a.example")]);
        let mut editing = plain.clone();
        editing.cell_data.get_mut("0-0").unwrap().is_editing = true;

        assert_eq!(
            plain.content().unwrap().state_hash().unwrap(),
            editing.content().unwrap().state_hash().unwrap()
        );
    }

    #[test]
    fn test_hash_changes_with_content() {
        let base = grid(&[("0-0", "https://a.example")]).content().unwrap();
        let other_url = grid(&[("0-0", "https://b.example")]).content().unwrap();
        let mut other_shape = base.clone();
        other_shape.cols = 3;

        let hash = base.state_hash().unwrap();
        assert_ne!(hash, other_url.state_hash().unwrap());
        assert_ne!(hash, other_shape.state_hash().unwrap());
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_canonical_json() {
        let content = grid(&[("1-0", "u2"), ("0-1", "u1")]).content().unwrap();
        assert_eq!(
            content.canonical_json().unwrap(),
            r#"{"rows":2,"cols":2,"cells":{"0-1":"u1","1-0":"u2"}}"#
        );
    }

    #[test]
    fn test_invalid_grids() {
        assert!(GridState::default().content().is_err());
        assert!(grid(&[("2-0", "u")]).content().is_err());
        assert!(grid(&[("top-left", "u")]).content().is_err());
        assert!(MultiTrackState::default().content().is_err());
    }

    #[test]
    fn test_multi_track_content() {
        let content = MultiTrackState::new(vec!["a".into(), "b".into()])
            .content()
            .unwrap();
        assert_eq!(content.rows, 2);
        assert_eq!(content.cols, 1);
        assert_eq!(content.cells["1-0"], "b");
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [ShareKind::Grid, ShareKind::MultiTrack] {
            assert_eq!(ShareKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(
            serde_json::to_string(&ShareKind::MultiTrack).unwrap(),
            "\"multi-track\""
        );
    }
}
