pub mod checkout_error;
pub mod checkout_request;
pub mod checkout_session;
pub mod deep_link;
pub mod notification;
pub mod outcome;
