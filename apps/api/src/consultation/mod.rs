// Consultation: intake → safety assessment → prompt → generation with a bounded
// corrective pass → topic tags → interaction log.

pub mod assembler;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod topics;
