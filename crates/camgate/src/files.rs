//! Device file materialization.
//!
//! Turns a device URI into a file in the save directory plus a public locator
//! under the media prefix. The camera's dual-fisheye `.insv` container is an
//! MP4 underneath, so it is saved as `.mp4` to be playable by browsers.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::device::DeviceHandle;
use crate::error::{ErrorKind, GatewayError, GatewayResult};

const PROPRIETARY_VIDEO_EXT: &str = "insv";
const PLAYABLE_VIDEO_EXT: &str = "mp4";

/// A device file and where it was materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub device_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_locator: Option<String>,
}

/// Per-item result of a batch download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub device_uri: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileOutcome {
    fn from_result(device_uri: &str, result: GatewayResult<FileRef>) -> Self {
        match result {
            Ok(file) => Self {
                device_uri: device_uri.to_string(),
                ok: true,
                file: Some(file),
                error_kind: None,
                message: None,
            },
            Err(err) => Self {
                device_uri: device_uri.to_string(),
                ok: false,
                file: None,
                error_kind: Some(err.kind()),
                message: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileMaterializer {
    save_dir: PathBuf,
    public_prefix: String,
}

impl FileMaterializer {
    pub fn new(save_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            save_dir: save_dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    /// Local destination for a device URI.
    pub fn local_path_for(&self, device_uri: &str) -> GatewayResult<PathBuf> {
        let name = base_name(device_uri).ok_or_else(|| {
            GatewayError::invalid_argument(format!("no file name in device uri {:?}", device_uri))
        })?;

        let mut path = self.save_dir.join(name);
        let is_insv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(PROPRIETARY_VIDEO_EXT))
            .unwrap_or(false);
        if is_insv {
            path.set_extension(PLAYABLE_VIDEO_EXT);
        }
        Ok(path)
    }

    /// Public URL for a materialized file: prefix + "/" + file name.
    pub fn public_locator(&self, local_path: &Path) -> GatewayResult<String> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                GatewayError::invalid_argument(format!(
                    "no file name in {}",
                    local_path.display()
                ))
            })?;
        Ok(format!("{}/{}", self.public_prefix.trim_end_matches('/'), name))
    }

    /// Download one file. Blank URIs fail before the device is touched.
    pub fn download(
        &self,
        device: &mut dyn DeviceHandle,
        device_uri: &str,
    ) -> GatewayResult<FileRef> {
        let local_path = self.checked_local_path(device_uri)?;
        self.download_to(device, device_uri, local_path)
    }

    /// Download every URI, in order. A failure never stops the rest.
    ///
    /// A URI repeated in the batch is fetched once and its outcome reused.
    /// Distinct URIs that map to the same local name get numbered names
    /// (`x.jpg`, `x_1.jpg`, ...) so no item overwrites or removes another's file.
    pub fn download_many(
        &self,
        device: &mut dyn DeviceHandle,
        uris: &[String],
    ) -> Vec<FileOutcome> {
        let mut seen: HashMap<&str, FileOutcome> = HashMap::new();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut outcomes = Vec::with_capacity(uris.len());

        for uri in uris {
            if let Some(done) = seen.get(uri.as_str()) {
                outcomes.push(done.clone());
                continue;
            }
            let result = match self.checked_local_path(uri) {
                Ok(path) => {
                    let path = unclaimed(path, &claimed);
                    claimed.insert(path.clone());
                    self.download_to(device, uri, path)
                }
                Err(e) => Err(e),
            };
            let outcome = FileOutcome::from_result(uri, result);
            seen.insert(uri.as_str(), outcome.clone());
            outcomes.push(outcome);
        }
        outcomes
    }

    fn checked_local_path(&self, device_uri: &str) -> GatewayResult<PathBuf> {
        if device_uri.trim().is_empty() {
            return Err(GatewayError::invalid_argument("device uri is empty"));
        }
        self.local_path_for(device_uri)
    }

    fn download_to(
        &self,
        device: &mut dyn DeviceHandle,
        device_uri: &str,
        local_path: PathBuf,
    ) -> GatewayResult<FileRef> {
        let public_locator = self.public_locator(&local_path)?;

        std::fs::create_dir_all(&self.save_dir).map_err(|e| GatewayError::DownloadFailed {
            uri: device_uri.to_string(),
            message: format!("cannot create {}: {}", self.save_dir.display(), e),
        })?;

        info!(device_uri, local_path = %local_path.display(), "downloading file");
        let mut last_percent = None;
        let mut progress = |current: u64, total: u64| {
            let percent = if total == 0 { 100 } else { current * 100 / total };
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                debug!(device_uri, current, total, percent, "download progress");
            }
        };

        // Only a file this call created counts as partial
        let preexisting = local_path.exists();
        if let Err(e) = device.download_file(device_uri, &local_path, &mut progress) {
            warn!(device_uri, error = %e, "download failed");
            if !preexisting && local_path.exists() {
                let _ = std::fs::remove_file(&local_path);
            }
            return Err(GatewayError::DownloadFailed {
                uri: device_uri.to_string(),
                message: e.to_string(),
            });
        }

        Ok(FileRef {
            device_uri: device_uri.to_string(),
            local_path: Some(local_path),
            public_locator: Some(public_locator),
        })
    }
}

/// `path`, or the first `stem_N.ext` not yet claimed in this batch.
fn unclaimed(path: PathBuf, claimed: &HashSet<PathBuf>) -> PathBuf {
    if !claimed.contains(&path) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let mut n = 1;
    loop {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let candidate = path.with_file_name(name);
        if !claimed.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Last path segment of a device URI, accepting both separator styles.
fn base_name(device_uri: &str) -> Option<&str> {
    let name = device_uri
        .trim()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()?;
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materializer(dir: &Path) -> FileMaterializer {
        FileMaterializer::new(dir, "http://media.local/files/")
    }

    #[test]
    fn test_base_name_separators() {
        assert_eq!(base_name("/DCIM/Camera01/VID_1.insv"), Some("VID_1.insv"));
        assert_eq!(base_name("C:\\DCIM\\IMG_2.insp"), Some("IMG_2.insp"));
        assert_eq!(base_name("plain.jpg"), Some("plain.jpg"));
        assert_eq!(base_name("/DCIM/"), None);
        assert_eq!(base_name("/DCIM/.."), None);
        assert_eq!(base_name("   "), None);
    }

    #[test]
    fn test_insv_rewritten_case_insensitive() {
        let m = materializer(Path::new("/srv/media"));
        assert_eq!(
            m.local_path_for("/DCIM/VID_1.insv").unwrap(),
            PathBuf::from("/srv/media/VID_1.mp4")
        );
        assert_eq!(
            m.local_path_for("/DCIM/VID_2.INSV").unwrap(),
            PathBuf::from("/srv/media/VID_2.mp4")
        );
        assert_eq!(
            m.local_path_for("/DCIM/IMG_3.insp").unwrap(),
            PathBuf::from("/srv/media/IMG_3.insp")
        );
    }

    #[test]
    fn test_public_locator_single_slash() {
        let m = materializer(Path::new("/srv/media"));
        let locator = m.public_locator(Path::new("/srv/media/VID_1.mp4")).unwrap();
        assert_eq!(locator, "http://media.local/files/VID_1.mp4");

        let bare = FileMaterializer::new("/srv/media", "/media");
        assert_eq!(
            bare.public_locator(Path::new("/x/y.jpg")).unwrap(),
            "/media/y.jpg"
        );
    }

    #[test]
    fn test_public_locator_requires_file_name() {
        let m = materializer(Path::new("/srv/media"));
        let err = m.public_locator(Path::new("/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_unclaimed_numbers_collisions() {
        let mut claimed = HashSet::new();
        let first = unclaimed(PathBuf::from("/srv/media/x.jpg"), &claimed);
        assert_eq!(first, PathBuf::from("/srv/media/x.jpg"));
        claimed.insert(first);

        let second = unclaimed(PathBuf::from("/srv/media/x.jpg"), &claimed);
        assert_eq!(second, PathBuf::from("/srv/media/x_1.jpg"));
        claimed.insert(second);

        assert_eq!(
            unclaimed(PathBuf::from("/srv/media/x.jpg"), &claimed),
            PathBuf::from("/srv/media/x_2.jpg")
        );
        let bare = HashSet::from([PathBuf::from("/srv/media/README")]);
        assert_eq!(
            unclaimed(PathBuf::from("/srv/media/README"), &bare),
            PathBuf::from("/srv/media/README_1")
        );
    }

    #[test]
    fn test_outcome_serializes_failure() {
        let outcome = FileOutcome::from_result(
            "/DCIM/b.jpg",
            Err(GatewayError::DownloadFailed {
                uri: "/DCIM/b.jpg".into(),
                message: "io".into(),
            }),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["errorKind"], "download_failed");
        assert_eq!(json["deviceUri"], "/DCIM/b.jpg");
        assert!(json.get("file").is_none());
    }
}
