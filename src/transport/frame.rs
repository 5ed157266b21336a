//! Транспортный фрейм `[topic, payload]` и его потоковое кодирование.
//!
//! Для потоковых транспортов (TCP) фрейм записывается как
//!
//! ```text
//! +-----------+---------+-------------+---------+
//! | u32 BE tl | topic   | u32 BE pl   | payload |
//! +-----------+---------+-------------+---------+
//! ```
//!
//! Внутрипроцессный транспорт передаёт [`Frame`] как есть.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::FrameError;

/// Размер префикса длины одной части.
const LEN_PREFIX: usize = 4;

/// Максимальный размер части фрейма по умолчанию (64 МиБ).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Двухчастный фрейм: тема (ключ маршрутизации) и полезная нагрузка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub topic: Bytes,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(
        topic: impl Into<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Тема как UTF-8 строка.
    pub fn topic_str(&self) -> Result<&str, FrameError> {
        std::str::from_utf8(&self.topic).map_err(|e| FrameError::InvalidTopic(e.to_string()))
    }

    /// Размер фрейма в потоковом представлении.
    pub fn encoded_len(&self) -> usize {
        2 * LEN_PREFIX + self.topic.len() + self.payload.len()
    }
}

/// Кодек фреймов с ограничением размера каждой части.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn encode(
        &self,
        frame: &Frame,
        dst: &mut BytesMut,
    ) -> Result<(), FrameError> {
        self.check_len(frame.topic.len())?;
        self.check_len(frame.payload.len())?;

        dst.reserve(frame.encoded_len());
        dst.put_u32(frame.topic.len() as u32);
        dst.put_slice(&frame.topic);
        dst.put_u32(frame.payload.len() as u32);
        dst.put_slice(&frame.payload);
        Ok(())
    }

    /// Извлекает из буфера один полный фрейм.
    ///
    /// Возвращает `Ok(None)`, если данных пока недостаточно; буфер при этом
    /// не изменяется.
    pub fn decode(
        &self,
        src: &mut BytesMut,
    ) -> Result<Option<Frame>, FrameError> {
        let Some(topic_len) = peek_len(src, 0) else {
            return Ok(None);
        };
        self.check_len(topic_len)?;

        let payload_at = LEN_PREFIX + topic_len;
        let Some(payload_len) = peek_len(src, payload_at) else {
            return Ok(None);
        };
        self.check_len(payload_len)?;

        if src.len() < payload_at + LEN_PREFIX + payload_len {
            return Ok(None);
        }

        src.advance(LEN_PREFIX);
        let topic = src.split_to(topic_len).freeze();
        src.advance(LEN_PREFIX);
        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Frame { topic, payload }))
    }

    /// Сколько байт требуется для следующего фрейма, исходя из уже
    /// известных префиксов длины.
    pub fn required_len(
        &self,
        src: &[u8],
    ) -> usize {
        let Some(topic_len) = peek_len(src, 0) else {
            return LEN_PREFIX;
        };
        let payload_at = LEN_PREFIX + topic_len;
        match peek_len(src, payload_at) {
            Some(payload_len) => payload_at + LEN_PREFIX + payload_len,
            None => payload_at + LEN_PREFIX,
        }
    }

    fn check_len(
        &self,
        size: usize,
    ) -> Result<(), FrameError> {
        if size > self.max_frame_size {
            return Err(FrameError::TooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

fn peek_len(
    src: &[u8],
    at: usize,
) -> Option<usize> {
    let bytes = src.get(at..at + LEN_PREFIX)?;
    let mut raw = [0u8; LEN_PREFIX];
    raw.copy_from_slice(bytes);
    Some(u32::from_be_bytes(raw) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(frame: &Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        FrameCodec::default().encode(frame, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_wire_layout() {
        let buf = encoded(&Frame::new("t", "xy"));
        assert_eq!(&buf[..], b"\x00\x00\x00\x01t\x00\x00\x00\x02xy");
    }

    /// Пустая тема (wildcard-фильтр) и пустая нагрузка допустимы.
    #[test]
    fn test_empty_parts() {
        let frame = Frame::new(Bytes::new(), Bytes::new());
        let mut buf = encoded(&frame);
        assert_eq!(buf.len(), 8);
        let decoded = FrameCodec::default().decode(&mut buf).unwrap();
        assert_eq!(decoded, Some(frame));
        assert!(buf.is_empty());
    }

    /// Неполные данные не потребляются, пока фрейм не придёт целиком.
    #[test]
    fn test_partial_input_is_kept() {
        let codec = FrameCodec::default();
        let full = encoded(&Frame::new("sensors.temperature", "{\"value\":23.5}"));

        let mut buf = BytesMut::new();
        for (i, byte) in full.iter().enumerate() {
            buf.put_u8(*byte);
            let res = codec.decode(&mut buf).unwrap();
            if i + 1 < full.len() {
                assert!(res.is_none(), "decoded too early at byte {i}");
                assert_eq!(buf.len(), i + 1);
            } else {
                let frame = res.unwrap();
                assert_eq!(frame.topic_str().unwrap(), "sensors.temperature");
            }
        }
    }

    #[test]
    fn test_two_frames_back_to_back() {
        let codec = FrameCodec::default();
        let mut buf = encoded(&Frame::new("a", "1"));
        buf.extend_from_slice(&encoded(&Frame::new("b", "2")));

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::new("a", "1")));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::new("b", "2")));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_too_large_is_rejected_both_ways() {
        let codec = FrameCodec::new(4);
        let mut out = BytesMut::new();
        let err = codec
            .encode(&Frame::new("t", "too long"), &mut out)
            .unwrap_err();
        assert_eq!(err, FrameError::TooLarge { size: 8, max: 4 });

        // Заголовок объявляет тему длиной 1000 байт.
        let mut buf = BytesMut::from(&b"\x00\x00\x03\xe8"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::TooLarge { size: 1000, .. })
        ));
    }

    #[test]
    fn test_required_len() {
        let codec = FrameCodec::default();
        let full = encoded(&Frame::new("abc", "12345"));
        assert_eq!(codec.required_len(&[]), 4);
        assert_eq!(codec.required_len(&full[..5]), 11);
        assert_eq!(codec.required_len(&full[..12]), full.len());
    }

    #[test]
    fn test_invalid_topic_utf8() {
        let frame = Frame::new(Bytes::from_static(&[0xff, 0xfe]), Bytes::new());
        assert!(matches!(frame.topic_str(), Err(FrameError::InvalidTopic(_))));
    }
}
