mod intersect;
mod report;
mod shape;
mod verifier;

pub use intersect::{Contact, obb_obb, ray_obb, ray_sphere, sphere_obb, sphere_sphere};
pub use report::{CandidateResult, CompensationFlags, HitReport, HitRequest, VerificationResult};
pub use shape::{TargetVolume, WeaponShape};
pub use verifier::{AdjustedTime, CompensationWindow, HitVerifier};
