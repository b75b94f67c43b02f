//! Tag-to-decoder table for framed jobs.

use std::collections::BTreeMap;

use crate::job::{Job, JobTag};
use crate::wire::{CorruptPayload, decode_payload};

/// Rebuilds a job from its untagged payload.
pub type Decoder = fn(&[u8]) -> Result<Job, CorruptPayload>;

/// Maps wire tags to decoders.
///
/// Built once, then shared by reference; decoding never mutates it.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    decoders: BTreeMap<String, Decoder>,
}

impl JobRegistry {
    /// Registry with no decoders.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry that knows every built-in job variant.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(JobTag::Pillar.as_str(), |bytes| {
            decode_payload(JobTag::Pillar, bytes)
        });
        registry.register(JobTag::Row.as_str(), |bytes| decode_payload(JobTag::Row, bytes));
        registry
    }

    /// Add or replace the decoder for `tag`.
    pub fn register(&mut self, tag: &str, decoder: Decoder) {
        self.decoders.insert(tag.to_owned(), decoder);
    }

    /// Decoder registered for `tag`.
    pub fn lookup(&self, tag: &str) -> Option<Decoder> {
        self.decoders.get(tag).copied()
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    /// Frame `job` with its tag.
    pub fn encode(&self, job: &Job) -> Vec<u8> {
        let tag = job.tag().as_str();
        let mut out = Vec::with_capacity(1 + tag.len());
        out.push(tag.len() as u8);
        out.extend_from_slice(tag.as_bytes());
        job.encode(&mut out);
        out
    }

    /// Rebuild a job from a framed buffer.
    pub fn decode(&self, bytes: &[u8]) -> Result<Job, CorruptPayload> {
        let (&tag_len, rest) = bytes.split_first().ok_or(CorruptPayload::Truncated)?;
        let tag_len = tag_len as usize;
        if rest.len() < tag_len {
            return Err(CorruptPayload::Truncated);
        }
        let (tag, payload) = rest.split_at(tag_len);
        let tag = std::str::from_utf8(tag).map_err(|_| CorruptPayload::BadTag)?;
        let decoder = self
            .lookup(tag)
            .ok_or_else(|| CorruptPayload::UnknownTag(tag.to_owned()))?;
        decoder(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Resume;

    #[test]
    fn standard_registry_knows_both_variants() {
        let registry = JobRegistry::standard();
        let tags: Vec<&str> = registry.tags().collect();
        assert_eq!(tags, vec!["rooks.pillar", "rooks.row"]);
        assert!(registry.lookup("rooks.row").is_some());
        assert!(registry.lookup("rooks.column").is_none());
    }

    #[test]
    fn framed_job_decodes() {
        let registry = JobRegistry::standard();
        let job = Job::initial(6, 4).unwrap();
        let bytes = registry.encode(&job);
        assert_eq!(bytes[0] as usize, "rooks.pillar".len());
        assert_eq!(&bytes[1..13], b"rooks.pillar");
        let back = registry.decode(&bytes).unwrap();
        assert_eq!(back, job);
        assert_eq!(back.resume(), Resume::Pillar { x: 5, y: 5, z: 0 });
    }

    #[test]
    fn unknown_and_truncated_frames_fail() {
        let registry = JobRegistry::standard();
        assert_eq!(registry.decode(&[]), Err(CorruptPayload::Truncated));
        assert_eq!(registry.decode(&[5, b'a']), Err(CorruptPayload::Truncated));
        assert_eq!(
            registry.decode(&[3, b'f', b'o', b'o', 1]),
            Err(CorruptPayload::UnknownTag("foo".to_owned()))
        );
        assert_eq!(registry.decode(&[1, 0xff]), Err(CorruptPayload::BadTag));
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let bytes = JobRegistry::standard().encode(&Job::initial(2, 0).unwrap());
        assert!(matches!(
            JobRegistry::empty().decode(&bytes),
            Err(CorruptPayload::UnknownTag(_))
        ));
    }

    #[test]
    fn custom_decoder_can_be_registered() {
        fn refuse(_: &[u8]) -> Result<Job, CorruptPayload> {
            Err(CorruptPayload::Version(0))
        }
        let mut registry = JobRegistry::standard();
        registry.register("rooks.pillar", refuse);
        let bytes = registry.encode(&Job::initial(2, 0).unwrap());
        assert_eq!(registry.decode(&bytes), Err(CorruptPayload::Version(0)));
    }
}
