use crate::error::Result;
use crate::models::ReportSettings;
use std::path::{Path, PathBuf};

/// 报表配置的 JSON 键值存储 (`data/config.json`)
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join("config.json"))
    }

    /// 文件不存在时返回空配置; 文件损坏时报错, 避免随后的保存把它覆盖掉
    pub async fn load(&self) -> Result<ReportSettings> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ReportSettings::default())
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Unreadable settings file {}: {}", self.path.display(), e);
            e.into()
        })
    }

    pub async fn save(&self, settings: &ReportSettings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(settings)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::models::UrlPair;

    #[tokio::test]
    async fn preserves_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"storeSheetUrl": "keep-me", "urlPairs": [{"dataUrl": "d", "reportUrl": "r"}]}"#,
        )
        .unwrap();

        let mut settings = store.load().await.unwrap();
        assert_eq!(settings.url_pairs.len(), 1);
        settings.url_pairs.push(UrlPair {
            data_url: "d2".into(),
            report_url: "r2".into(),
            data_sheet_id: None,
            report_sheet_id: None,
        });
        store.save(&settings).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("config.json")).unwrap())
                .unwrap();
        assert_eq!(raw["storeSheetUrl"], "keep-me");
        assert_eq!(raw["urlPairs"][1]["dataUrl"], "d2");
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"urlPairs": [{"dataUrl": "#).unwrap();

        let err = SettingsStore::in_dir(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, ReportError::Json(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"urlPairs": [{"dataUrl": "#);
    }

    #[tokio::test]
    async fn missing_file_is_unconfigured() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::in_dir(dir.path()).load().await.unwrap();
        assert!(!settings.is_configured());
        assert!(settings.summary_url().is_none());
    }
}
