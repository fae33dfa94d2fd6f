//! Connection handshake.
//!
//! The client and server exchange product versions before authenticating:
//!
//! 1. Client sends an `Initiate` request carrying a random challenge
//! 2. Server answers `AcceptChallenge` with its packed version as the challenge
//! 3. Client checks compatibility and resends the request as
//!    `ChallengeAccepted`, carrying its own packed version
//! 4. Server answers `ProceedWithAuthentication`

mod negotiation;
mod version;

pub use negotiation::{Handshake, HandshakeState, HandshakeStep, DEFAULT_MAX_ROUNDS};
pub use version::{BuildType, Edition, ProductVersion};
