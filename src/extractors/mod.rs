pub mod gate;
pub mod session;

pub use gate::{Authorized, Capability, Student, StudentAccess, Teacher, TeacherAccess};
pub use session::{GateRejection, Session, PROFILE_MISSING};
