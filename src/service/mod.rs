pub mod chat_service;
pub mod session_manager;

#[cfg(test)]
pub(crate) mod test_support;
