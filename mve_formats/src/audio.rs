use crossbeam_channel::{unbounded, Receiver, Sender};

/// Producer half of the decoded PCM queue, owned by the decoder.
///
/// Ownership of each queued buffer transfers to the stream; the host mixer
/// may drain it from another thread while the decoder keeps producing.
pub(crate) struct AudioQueue {
    sender: Sender<Vec<u8>>,
    stream: AudioStream,
}

impl AudioQueue {
    pub fn new(sample_rate: u16) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            stream: AudioStream {
                sample_rate,
                receiver,
            },
        }
    }

    /// Queue a buffer of unsigned 8-bit mono samples.
    pub fn queue_buffer(&self, samples: Vec<u8>) {
        // A send only fails once every stream handle is gone.
        let _ = self.sender.send(samples);
    }

    /// Queue `len` samples of unsigned-PCM silence.
    pub fn queue_silence(&self, len: usize) {
        self.queue_buffer(vec![0x80; len]);
    }

    pub fn stream(&self) -> AudioStream {
        self.stream.clone()
    }
}

/// Host-side handle to the queued PCM stream. Cloneable and safe to drain
/// from a mixer thread.
#[derive(Clone)]
pub struct AudioStream {
    sample_rate: u16,
    receiver: Receiver<Vec<u8>>,
}

impl AudioStream {
    /// Sample rate declared by the audio-init opcode, in Hz.
    pub fn sample_rate(&self) -> u32 {
        u32::from(self.sample_rate)
    }

    /// Pop the next queued buffer without blocking.
    pub fn try_next(&self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }

    /// Number of buffers currently queued.
    pub fn queued_buffers(&self) -> usize {
        self.receiver.len()
    }
}
