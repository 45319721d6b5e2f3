//! Library-level integration tests against real workspaces on disk.

mod properties;
mod webgpu_workspace;
