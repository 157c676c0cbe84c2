//! Deterministic object keys and download filenames.

/// Storage key for a job's finished clip.
pub fn clip_object_key(job_id: &str) -> String {
    format!("clips/{}.mp4", job_id)
}

/// Filename suggested to the downloading client.
pub fn attachment_filename(job_id: &str) -> String {
    format!("clip_{}.mp4", sanitize_filename_component(job_id))
}

/// Content-Disposition header value marking the object as an attachment.
pub fn attachment_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", sanitize_filename_component(filename))
}

/// Strip characters that would break a filename or the disposition header.
fn sanitize_filename_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
