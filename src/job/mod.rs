mod request;
mod spec;
mod status;

pub use request::RequestBuilder;
pub use spec::{JobSpec, RawJobSpec, RawNumber, split_command};
pub use status::{Attempt, AttemptContainer, JobObservation, JobStatus};
