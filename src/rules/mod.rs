mod command;
mod cpp;
mod link;

pub(crate) use command::CommandRule;
pub(crate) use cpp::CppRule;
pub(crate) use link::LinkRule;
