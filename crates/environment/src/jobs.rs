//! Environment loading off the render thread.
//!
//! Requests are numbered; only the result of the newest request is handed
//! back. The worker also skips requests that were superseded while it was
//! busy.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use glint_settings::StudioPreset;

use crate::EnvironmentError;
use crate::loader::{EnvironmentAsset, EnvironmentLoader};
use crate::prefilter::PrefilteredEnvironment;
use crate::studio::{STUDIO_RESOLUTION, bake_lightformers, studio_lightformers};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnvironmentRequest {
    Hdr { file: String },
    /// Panorama image; `sphere` keeps it unfiltered for the sphere backdrop.
    Panorama { file: String, sphere: bool },
    Studio { preset: StudioPreset },
}

impl std::fmt::Display for EnvironmentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvironmentRequest::Hdr { file } => write!(f, "hdr {file}"),
            EnvironmentRequest::Panorama { file, sphere } => {
                let mode = if *sphere { "sphere" } else { "environment" };
                write!(f, "panorama {file} ({mode})")
            }
            EnvironmentRequest::Studio { preset } => write!(f, "studio {}", preset.label()),
        }
    }
}

/// Load or bake whatever `request` names. Never fails: missing HDR and
/// panorama environments degrade to the fallback color.
pub fn resolve(loader: &EnvironmentLoader, request: &EnvironmentRequest) -> EnvironmentAsset {
    match request {
        EnvironmentRequest::Hdr { file } => loader.load(file).into(),
        EnvironmentRequest::Panorama { file, sphere: false } => loader.load(file).into(),
        EnvironmentRequest::Panorama { file, sphere: true } => match loader.load_image(file) {
            Ok((path, image)) => {
                tracing::info!("panorama loaded from {}", path.display());
                EnvironmentAsset::Panorama(Arc::new(image))
            }
            Err(err) => {
                tracing::warn!("{err}");
                EnvironmentAsset::Missing {
                    color: crate::FALLBACK_COLOR,
                }
            }
        },
        EnvironmentRequest::Studio { preset } => {
            let config = loader.config();
            // Anything above twice the base level is discarded by the prefilter.
            let width = STUDIO_RESOLUTION.min(config.base_width.saturating_mul(2).max(8));
            let rig = studio_lightformers(*preset);
            let image = bake_lightformers(&rig.forms, rig.background, width);
            EnvironmentAsset::Prefiltered(Arc::new(PrefilteredEnvironment::from_equirect(
                image, config,
            )))
        }
    }
}

/// A finished request.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub generation: u64,
    pub request: EnvironmentRequest,
    pub asset: EnvironmentAsset,
}

pub struct EnvironmentJobs {
    requests: Option<Sender<(u64, EnvironmentRequest)>>,
    results: Receiver<JobResult>,
    generation: u64,
}

impl EnvironmentJobs {
    /// Start the worker thread.
    pub fn spawn(loader: EnvironmentLoader) -> Result<Self, EnvironmentError> {
        let (req_tx, req_rx) = mpsc::channel::<(u64, EnvironmentRequest)>();
        let (res_tx, res_rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("environment-loader".into())
            .spawn(move || worker(loader, req_rx, res_tx))
            .map_err(|_| EnvironmentError::WorkerGone)?;
        Ok(Self {
            requests: Some(req_tx),
            results: res_rx,
            generation: 0,
        })
    }

    /// Queue a request; it supersedes every earlier one.
    pub fn submit(&mut self, request: EnvironmentRequest) -> Result<u64, EnvironmentError> {
        let requests = self.requests.as_ref().ok_or(EnvironmentError::WorkerGone)?;
        self.generation += 1;
        tracing::debug!("environment request {} -> {}", self.generation, request);
        requests
            .send((self.generation, request))
            .map_err(|_| EnvironmentError::WorkerGone)?;
        Ok(self.generation)
    }

    /// Stop accepting requests. The worker exits after its current job.
    pub fn shutdown(&mut self) {
        self.requests = None;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking check for the newest result.
    ///
    /// Fails with [`EnvironmentError::WorkerGone`] once the worker has
    /// exited and every result it sent has been drained.
    pub fn poll(&mut self) -> Result<Option<JobResult>, EnvironmentError> {
        let mut latest = None;
        loop {
            match self.results.try_recv() {
                Ok(result) => {
                    if let Some(r) = self.accept(result) {
                        latest = Some(r);
                    }
                }
                Err(TryRecvError::Empty) => return Ok(latest),
                Err(TryRecvError::Disconnected) => {
                    return match latest {
                        Some(r) => Ok(Some(r)),
                        None => Err(EnvironmentError::WorkerGone),
                    };
                }
            }
        }
    }

    /// Block until the newest request finishes or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Result<Option<JobResult>, EnvironmentError> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            match self.results.recv_timeout(left) {
                Ok(result) => {
                    if let Some(r) = self.accept(result) {
                        return Ok(Some(r));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(EnvironmentError::WorkerGone),
            }
        }
    }

    fn accept(&self, result: JobResult) -> Option<JobResult> {
        if result.generation == self.generation {
            Some(result)
        } else {
            tracing::debug!(
                "dropping stale environment {} (generation {}, current {})",
                result.request,
                result.generation,
                self.generation
            );
            None
        }
    }
}

fn worker(
    loader: EnvironmentLoader,
    requests: Receiver<(u64, EnvironmentRequest)>,
    results: Sender<JobResult>,
) {
    while let Ok(mut job) = requests.recv() {
        // Only the newest queued request matters.
        while let Ok(newer) = requests.try_recv() {
            tracing::debug!("skipping superseded request {}", job.0);
            job = newer;
        }
        let (generation, request) = job;
        let asset = resolve(&loader, &request);
        if results
            .send(JobResult {
                generation,
                request,
                asset,
            })
            .is_err()
        {
            break;
        }
    }
    tracing::debug!("environment worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrefilterConfig;
    use glint_assets::EquirectImage;

    fn loader(root: &std::path::Path) -> EnvironmentLoader {
        EnvironmentLoader::new(
            vec![root.to_path_buf()],
            PrefilterConfig {
                base_width: 16,
                levels: 3,
                samples: 8,
                irradiance_width: 4,
                irradiance_samples: 16,
            },
        )
    }

    #[test]
    fn only_latest_generation_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        EquirectImage::solid(16, 8, [1.0; 3])
            .write_hdr(dir.path().join("a.hdr"))
            .unwrap();
        EquirectImage::solid(16, 8, [3.0; 3])
            .write_hdr(dir.path().join("b.hdr"))
            .unwrap();
        let mut jobs = EnvironmentJobs::spawn(loader(dir.path())).unwrap();
        jobs.submit(EnvironmentRequest::Hdr { file: "a.hdr".into() })
            .unwrap();
        let last = jobs
            .submit(EnvironmentRequest::Hdr { file: "b.hdr".into() })
            .unwrap();
        let result = jobs.wait(Duration::from_secs(30)).unwrap().unwrap();
        assert_eq!(result.generation, last);
        assert_eq!(
            result.request,
            EnvironmentRequest::Hdr { file: "b.hdr".into() }
        );
        match result.asset {
            EnvironmentAsset::Prefiltered(env) => {
                assert!((env.sample(glam::Vec3::X, 0.0).x - 3.0).abs() < 0.1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(jobs.poll().unwrap().is_none());
    }

    #[test]
    fn exited_worker_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut jobs = EnvironmentJobs::spawn(loader(dir.path())).unwrap();
        jobs.shutdown();
        assert!(matches!(
            jobs.submit(EnvironmentRequest::Hdr { file: "a.hdr".into() }),
            Err(EnvironmentError::WorkerGone)
        ));
        // The worker sees the closed queue and drops its result sender.
        assert!(matches!(
            jobs.wait(Duration::from_secs(30)),
            Err(EnvironmentError::WorkerGone)
        ));
        assert!(matches!(jobs.poll(), Err(EnvironmentError::WorkerGone)));
    }

    #[test]
    fn result_sent_before_exit_is_still_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let mut jobs = EnvironmentJobs::spawn(loader(dir.path())).unwrap();
        let generation = jobs
            .submit(EnvironmentRequest::Hdr {
                file: "absent-91d2.hdr".into(),
            })
            .unwrap();
        jobs.shutdown();
        let result = jobs.wait(Duration::from_secs(30)).unwrap().unwrap();
        assert_eq!(result.generation, generation);
        assert!(matches!(jobs.wait(Duration::from_secs(30)), Err(EnvironmentError::WorkerGone)));
    }

    #[test]
    fn missing_hdr_resolves_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let asset = resolve(
            &loader(dir.path()),
            &EnvironmentRequest::Hdr {
                file: "absent-91d2.hdr".into(),
            },
        );
        assert!(matches!(asset, EnvironmentAsset::Missing { .. }));
    }

    #[test]
    fn panorama_sphere_keeps_raw_image() {
        let dir = tempfile::tempdir().unwrap();
        EquirectImage::solid(20, 10, [0.5; 3])
            .write_hdr(dir.path().join("pano.hdr"))
            .unwrap();
        let asset = resolve(
            &loader(dir.path()),
            &EnvironmentRequest::Panorama {
                file: "/pano.hdr".into(),
                sphere: true,
            },
        );
        match asset {
            EnvironmentAsset::Panorama(img) => assert_eq!(img.width, 20),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn studio_request_bakes() {
        let dir = tempfile::tempdir().unwrap();
        let asset = resolve(
            &loader(dir.path()),
            &EnvironmentRequest::Studio {
                preset: StudioPreset::Default,
            },
        );
        match asset {
            EnvironmentAsset::Prefiltered(env) => {
                assert!(env.sample(glam::Vec3::Y, 0.0).x > 0.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
