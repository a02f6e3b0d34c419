/*!
 * Conversion job supervision.
 *
 * - `job`: job records, options, outcomes and the caller's handle
 * - `results`: one-time download tokens for completed subtitles
 * - `gate`: authorization and usage accounting collaborator
 * - `pipeline`: the per-job stage driver
 * - `manager`: the single-flight `Supervisor`
 */

pub mod gate;
pub mod job;
pub mod manager;
pub mod pipeline;
pub mod results;

pub use self::gate::{AccessGate, AllowAll, CallerIdentity};
pub use self::job::{CompletedJob, ConversionOptions, Job, JobHandle, JobId, JobOutcome, JobStage, JobState};
pub use self::manager::{SubmitRequest, Supervisor};
pub use self::pipeline::{Pipeline, PipelineOutput};
pub use self::results::{ResultStore, ResultToken, RetrievedResult};
