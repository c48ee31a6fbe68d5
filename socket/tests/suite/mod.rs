mod calls;
mod lifecycle;
mod push;
mod support;
