pub(crate) mod deploy;
pub(crate) mod status;
pub(crate) mod unlock;
pub(crate) mod upgrade;
