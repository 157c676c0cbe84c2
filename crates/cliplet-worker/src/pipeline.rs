//! The pipeline orchestrator for one clip job.
//!
//! Stages run in strict sequence (download, rotation analysis, trim,
//! upload), aborting on the first failure. The job's status record is
//! written after every transition; record-write failures are logged and
//! swallowed so a status hiccup can never change the job's real outcome.
//! The per-job working directory is removed on every exit path, including
//! wall-clock timeout.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use cliplet_media::{
    analyze_rotation, build_extraction_configs, download_clip_source, fs_utils, probe_video,
    resolve_cookies, trim_clip, CredentialPaths, DownloadLimits, TrimSpec,
};
use cliplet_models::{resolve_format, resolve_platform, JobId};
use cliplet_queue::{ClipJob, JobStateStore};
use cliplet_storage::{
    attachment_disposition, attachment_filename, clip_object_key, content_type_for, R2Client,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Everything the pipeline needs, shared across jobs.
pub struct PipelineContext {
    pub config: WorkerConfig,
    pub store: JobStateStore,
    pub storage: R2Client,
    pub credentials: CredentialPaths,
}

impl PipelineContext {
    fn download_limits(&self) -> DownloadLimits {
        DownloadLimits {
            max_filesize_mb: self.config.max_download_mb,
            attempt_timeout: self.config.download_attempt_timeout,
        }
    }

    fn work_dir_for(&self, job_id: &JobId) -> PathBuf {
        Path::new(&self.config.work_dir).join(job_id.as_str())
    }
}

/// Drive one job from claim to terminal state.
///
/// Returns the object key on success. The terminal record write (done or
/// error, with code and truncated message) happens here, before returning.
pub async fn process_clip_job(ctx: &PipelineContext, job: &ClipJob) -> WorkerResult<String> {
    let logger = JobLogger::new(&job.job_id);
    write_or_log(&logger, ctx.store.mark_working(&job.job_id).await);

    // The wall-clock timeout wraps the stages only; cleanup and the terminal
    // record write below run on every path. Dropping the stage future kills
    // any extractor/transcoder child via kill_on_drop.
    let work_dir = ctx.work_dir_for(&job.job_id);
    let outcome = match fs_utils::ensure_work_dir(&work_dir).await {
        Err(e) => Err(WorkerError::Io(std::io::Error::other(format!(
            "Failed to create work dir: {}",
            e
        )))),
        Ok(()) => match tokio::time::timeout(
            ctx.config.job_timeout,
            run_stages(ctx, job, &work_dir, &logger),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                let stage = ctx
                    .store
                    .read_stage(&job.job_id)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                Err(WorkerError::JobTimeout { stage })
            }
        },
    };

    fs_utils::remove_dir_best_effort(&work_dir).await;

    match &outcome {
        Ok(object_key) => {
            write_or_log(&logger, ctx.store.mark_done(&job.job_id, object_key).await);
            logger.completion(object_key);
        }
        Err(e) => {
            let code = e.error_code();
            let message = e.to_string();
            write_or_log(
                &logger,
                ctx.store.mark_error(&job.job_id, code, &message).await,
            );
            logger.failure(code.as_str(), &message);
        }
    }

    outcome
}

/// The stage sequence proper: download, rotation analysis, trim, upload.
async fn run_stages(
    ctx: &PipelineContext,
    job: &ClipJob,
    work_dir: &Path,
    logger: &JobLogger,
) -> WorkerResult<String> {
    // Platform and format resolution is pure table lookup; it never fails
    let platform = resolve_platform(&job.url);
    let selector = resolve_format(platform, job.resolution.as_deref(), job.format_id.as_deref());
    info!(
        job_id = %job.job_id,
        platform = %platform,
        selector = %selector,
        "Resolved format selector"
    );

    // Download
    logger.stage("downloading", "Downloading source");
    write_or_log(
        logger,
        ctx.store.set_progress(&job.job_id, 10, "downloading").await,
    );

    let cookies = resolve_cookies(platform, &ctx.credentials).await;
    let configs = build_extraction_configs(platform, cookies.as_deref());
    let source_path = work_dir.join("source.mp4");

    let asset = download_clip_source(
        &job.url,
        &selector,
        &configs,
        &ctx.download_limits(),
        &source_path,
    )
    .await
    .map_err(WorkerError::Download)?;

    if let Some(ref title) = asset.title {
        debug!(job_id = %job.job_id, title = %title, "Source title");
    }

    // Rotation analysis
    let info = probe_video(&asset.path).await.map_err(WorkerError::Download)?;
    let plan = analyze_rotation(&info);
    debug!(
        job_id = %job.job_id,
        transform = ?plan.transform,
        stabilize = plan.stabilize,
        "Rotation analysis complete"
    );

    // Trim
    logger.stage("trimming", "Trimming clip");
    write_or_log(
        logger,
        ctx.store.set_progress(&job.job_id, 50, "trimming").await,
    );

    let clip_path = work_dir.join("clip.mp4");
    let spec = TrimSpec {
        start_seconds: job.start_seconds,
        end_seconds: job.end_seconds,
        plan,
        timeout_secs: ctx.config.trim_timeout.as_secs(),
    };
    let trim_outcome = trim_clip(&asset.path, &clip_path, &spec)
        .await
        .map_err(WorkerError::Trim)?;
    if let Some(drift) = trim_outcome.drift_secs {
        logger.warning(&format!("Trim duration drifted {:.2}s from request", drift));
    }

    // Upload
    logger.stage("uploading", "Uploading clip");
    write_or_log(
        logger,
        ctx.store.set_progress(&job.job_id, 80, "uploading").await,
    );

    let object_key = clip_object_key(job.job_id.as_str());
    let filename = attachment_filename(job.job_id.as_str());
    ctx.storage
        .upload_file(
            &clip_path,
            &object_key,
            content_type_for(&clip_path),
            Some(&attachment_disposition(&filename)),
        )
        .await
        .map_err(WorkerError::Upload)?;

    // Time-bounded access reference; the delivery layer re-presigns on
    // demand from the stored object key, this one is for the logs
    match ctx
        .storage
        .presign_get(&object_key, ctx.config.presign_expiry, Some(&filename))
        .await
    {
        Ok(url) => debug!(job_id = %job.job_id, access_url = %url, "Presigned access reference"),
        Err(e) => logger.warning(&format!("Failed to presign access reference: {}", e)),
    }

    Ok(object_key)
}

/// Status writes must never fail the pipeline: log and move on.
fn write_or_log<E: std::fmt::Display>(logger: &JobLogger, result: Result<(), E>) {
    if let Err(e) = result {
        logger.warning(&format!("Job record write failed (ignored): {}", e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliplet_queue::StateStoreConfig;

    fn test_context() -> PipelineContext {
        PipelineContext {
            config: WorkerConfig::default(),
            store: JobStateStore::new(StateStoreConfig::default()).unwrap(),
            storage: test_storage(),
            credentials: CredentialPaths::default(),
        }
    }

    fn test_storage() -> R2Client {
        // Building the client performs no I/O
        futures_block_on(R2Client::new(cliplet_storage::R2Config {
            endpoint_url: "http://localhost:9000".to_string(),
            access_key_id: "test".to_string(),
            secret_access_key: "test".to_string(),
            bucket_name: "test".to_string(),
            region: "auto".to_string(),
        }))
        .unwrap()
    }

    fn futures_block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn work_dirs_are_private_per_job() {
        let ctx = test_context();
        let a = ctx.work_dir_for(&JobId::from_string("a"));
        let b = ctx.work_dir_for(&JobId::from_string("b"));
        assert_ne!(a, b);
        assert!(a.starts_with(&ctx.config.work_dir));
    }

    #[test]
    fn download_limits_follow_config() {
        let mut ctx = test_context();
        ctx.config.max_download_mb = 123;
        let limits = ctx.download_limits();
        assert_eq!(limits.max_filesize_mb, 123);
        assert_eq!(limits.attempt_timeout, ctx.config.download_attempt_timeout);
    }
}
