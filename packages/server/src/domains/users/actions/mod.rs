mod register;

pub use register::{register_user, Registration, RegistrationRequest};
