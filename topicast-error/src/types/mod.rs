pub mod codec;
pub mod frame;
pub mod notify;
pub mod subscriber;
pub mod transport;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы
// упростить доступ к ним из внешнего кода.
pub use codec::*;
pub use frame::*;
pub use notify::*;
pub use subscriber::*;
pub use transport::*;
