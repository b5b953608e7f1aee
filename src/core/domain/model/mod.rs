pub mod guest;
pub mod guest_network;
pub mod host_connection;
pub mod host_options;
pub mod node_list_item;
pub mod node_status;
pub mod snapshot;
pub mod target;
pub mod version;

pub use guest::{GuestAction, GuestListItem, GuestStatus, GuestType};
pub use host_connection::HostConnection;
pub use host_options::{HostOptions, IpMode, IpPolicy};
pub use node_list_item::NodeListItem;
pub use node_status::NodeStatus;
pub use snapshot::{ClusterSnapshot, GuestKey, GuestSnapshot, NodeSnapshot, Usage};
pub use target::{GuestRef, OneOrMany, RawTarget, TargetSpec};
pub use version::ApiVersion;
