//! Транспорт pub/sub: адреса, фреймы, сокеты.
//!
//! Издатель ([`PubSocket`]) рассылает фреймы `[topic, payload]` всем
//! подключённым получателям; получатель ([`SubSocket`]) пропускает только
//! фреймы, тема которых начинается с одного из подписанных префиксов.
//! Поддерживаются адреса `inproc://` (в пределах одного [`Context`]) и
//! `tcp://`.

pub mod codec;
pub mod context;
pub mod endpoint;
pub mod filter;
pub mod frame;
pub mod socket;

pub use codec::PayloadCodec;
pub use context::Context;
pub use endpoint::Endpoint;
pub use filter::{topic_prefix, SubscriptionFilter};
pub use frame::{Frame, FrameCodec, DEFAULT_MAX_FRAME_SIZE};
pub use socket::{PubSocket, PubStats, SubSocket};
