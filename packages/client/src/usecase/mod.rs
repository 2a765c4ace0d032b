//! UseCase 層
//!
//! ルームセッションのロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層のポートを介して Infrastructure 層を操作します。

pub mod error;
pub mod room_session;
pub mod session_handle;

pub use error::SessionError;
pub use room_session::{RoomSession, SessionEvent, SessionState};
pub use session_handle::SessionHandle;
