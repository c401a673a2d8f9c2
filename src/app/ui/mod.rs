mod controls;
mod details;
mod fps;
mod panels;

pub(super) use fps::FpsCounter;

/// What the window asked its host to do during one frame.
#[derive(Debug, Default)]
pub(super) struct HostRequest {
    pub reload: bool,
    pub reset: bool,
}
