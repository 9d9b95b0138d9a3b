/// In-memory backend used by tests to observe and fail storage writes
use crate::{
    assets::{AssetBackend, AssetKey, MediaType, StagedUpload},
    error::{TubelyError, TubelyResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncReadExt;

#[derive(Default)]
pub struct MemoryBackend {
    fail: bool,
    calls: AtomicUsize,
    objects: Mutex<HashMap<String, (MediaType, Vec<u8>)>>,
}

impl MemoryBackend {
    /// Backend whose writes always fail part-way through
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn object(&self, key: &str) -> Option<(MediaType, Vec<u8>)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl AssetBackend for MemoryBackend {
    async fn store(
        &self,
        key: &AssetKey,
        media_type: MediaType,
        staged: &mut StagedUpload,
    ) -> TubelyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        staged.rewind().await?;
        let mut data = Vec::new();
        staged.reader().read_to_end(&mut data).await?;

        if self.fail {
            return Err(TubelyError::StorageWriteFailed(format!(
                "simulated I/O error after {} bytes",
                data.len() / 2
            )));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (media_type, data));
        Ok(self.url_for(key))
    }

    fn url_for(&self, key: &AssetKey) -> String {
        format!("memory://assets/{}", key)
    }
}
