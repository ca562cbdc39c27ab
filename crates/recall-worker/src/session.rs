//! Recognition session: frame buffer, enrollment buffer and event dispatch.
//!
//! One `Session` owns all mutable worker state. Each inbound event is handled
//! to completion before the next; gallery load/save are awaited inline, so a
//! frame can never observe a half-loaded gallery.

use crate::protocol::{InboundEvent, OutboundEvent};
use recall_core::{distinct_names, Candidate, Descriptor, FaceData, FrameBuffer, RecognitionEngine};
use std::collections::HashMap;

/// Fixed name of the persisted gallery.
pub const GALLERY_FILE_NAME: &str = "recognition_gallery.json";

/// Reported when no gallery identity matches.
pub const UNKNOWN_NAME: &str = "?";

/// Prefix of identities minted by enrollment: `Person1`, `Person2`, ...
pub const GENERATED_NAME_PREFIX: &str = "Person";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Similarity must be strictly greater than this to count as a match.
    pub similarity_threshold: f32,
    /// Pending-buffer capacity; reaching it enrolls a new identity.
    pub descriptors_per_identity: usize,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl SessionConfig {
    pub const DEFAULT_THRESHOLD: f32 = 0.45;
    pub const DEFAULT_DESCRIPTORS_PER_IDENTITY: usize = 5;
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: Self::DEFAULT_THRESHOLD,
            descriptors_per_identity: Self::DEFAULT_DESCRIPTORS_PER_IDENTITY,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

pub struct Session<E> {
    config: SessionConfig,
    /// `None` until the engine reports ready.
    engine: Option<E>,
    frame: FrameBuffer,
    /// Descriptors of the emerging, not-yet-named identity.
    pending: Vec<Descriptor>,
    frozen: bool,
    person_counter: u32,
    last_name: String,
}

impl<E: RecognitionEngine> Session<E> {
    pub fn new(config: SessionConfig) -> Self {
        let frame = FrameBuffer::new(config.frame_width, config.frame_height);
        Self {
            config,
            engine: None,
            frame,
            pending: Vec::new(),
            frozen: false,
            person_counter: 0,
            last_name: UNKNOWN_NAME.to_string(),
        }
    }

    /// Attach a ready engine. Requests that arrived earlier were dropped.
    pub fn initialize(&mut self, engine: E) -> OutboundEvent {
        self.engine = Some(engine);
        self.person_counter = 0;
        tracing::info!(
            width = self.frame.width(),
            height = self.frame.height(),
            "recognition initialized"
        );
        OutboundEvent::InitializationDone
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn person_counter(&self) -> u32 {
        self.person_counter
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn last_recognized_name(&self) -> &str {
        &self.last_name
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Route one event to its handler. Returns the event to post back, if any.
    pub async fn handle(&mut self, event: InboundEvent) -> Option<OutboundEvent> {
        tracing::trace!(topic = event.topic(), "dispatch");
        match event {
            InboundEvent::Resolution { width, height } => {
                self.set_resolution(width, height);
                None
            }
            InboundEvent::SendFrame {
                pixels,
                face_data,
                freeze,
            } => Some(self.recognize_frame(&pixels, face_data.as_ref(), freeze)),
            InboundEvent::TrackStatus => Some(self.reset_tracking()),
            InboundEvent::LoadGallery => self.load_gallery().await,
            InboundEvent::SaveGallery => self.save_gallery().await,
            InboundEvent::ClearGallery => Some(self.clear_gallery()),
            InboundEvent::ChangeName { mapping } => Some(self.change_name(&mapping)),
        }
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        if (width, height) != (self.frame.width(), self.frame.height()) {
            match self.frame.resize(width, height) {
                Ok(()) => tracing::debug!(width, height, "frame resolution changed"),
                Err(e) => tracing::warn!(error = %e, "resolution rejected; keeping current frame"),
            }
        }
    }

    /// Run one recognition pass and report the name (or `"?"`).
    pub fn recognize_frame(
        &mut self,
        pixels: &[u8],
        face: Option<&FaceData>,
        freeze: bool,
    ) -> OutboundEvent {
        self.frozen = freeze;

        if self.engine.is_none() {
            tracing::debug!("frame received before initialization; skipped");
        } else {
            self.frame.copy_from(pixels);
            self.last_name = if freeze {
                self.frozen_pass(face)
            } else {
                self.active_pass(face)
            };
        }

        OutboundEvent::Recognized {
            recognized_name: self.last_name.clone(),
        }
    }

    /// Match against the gallery, enrolling a new identity after enough
    /// consistent unmatched samples.
    fn active_pass(&mut self, face: Option<&FaceData>) -> String {
        let Some(engine) = self.engine.as_mut() else {
            return UNKNOWN_NAME.to_string();
        };
        let threshold = self.config.similarity_threshold;

        let descriptor = match engine.extract_descriptor(&self.frame, face) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "descriptor extraction failed; frame skipped");
                return UNKNOWN_NAME.to_string();
            }
        };

        if let Some(best) = best_match(&*engine, &descriptor) {
            if best.similarity > threshold {
                tracing::debug!(
                    name = %best.name,
                    similarity = best.similarity,
                    index = best.index,
                    "matched"
                );
                self.pending.clear();
                return best.name;
            }
        }

        let max_sim = self
            .pending
            .iter()
            .map(|p| engine.descriptors_similarity(p, &descriptor))
            .fold(0.0f32, f32::max);

        if !self.pending.is_empty() && max_sim <= threshold {
            tracing::debug!(
                discarded = self.pending.len(),
                max_sim,
                "different face during enrollment; restarting"
            );
            self.pending.clear();
        }
        self.pending.push(descriptor);

        if self.pending.len() < self.config.descriptors_per_identity {
            return UNKNOWN_NAME.to_string();
        }

        let Some(next) = self.person_counter.checked_add(1) else {
            tracing::warn!(
                discarded = self.pending.len(),
                "generated name counter exhausted; enrollment dropped"
            );
            self.pending.clear();
            return UNKNOWN_NAME.to_string();
        };
        self.person_counter = next;
        let name = format!("{GENERATED_NAME_PREFIX}{next}");
        let enrolled = self.pending.len();
        for descriptor in self.pending.drain(..) {
            engine.add_descriptor(descriptor, &name);
        }
        tracing::info!(name = %name, descriptors = enrolled, "enrolled new identity");
        name
    }

    /// Match only; never enrolls and never keeps pending samples.
    fn frozen_pass(&mut self, face: Option<&FaceData>) -> String {
        if !self.pending.is_empty() {
            tracing::debug!(discarded = self.pending.len(), "gallery frozen; enrollment dropped");
            self.pending.clear();
        }

        let Some(engine) = self.engine.as_mut() else {
            return UNKNOWN_NAME.to_string();
        };
        if engine.descriptor_count() == 0 {
            return UNKNOWN_NAME.to_string();
        }

        let descriptor = match engine.extract_descriptor(&self.frame, face) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "descriptor extraction failed; frame skipped");
                return UNKNOWN_NAME.to_string();
            }
        };

        match best_match(&*engine, &descriptor) {
            Some(best) if best.similarity > self.config.similarity_threshold => {
                tracing::debug!(
                    name = %best.name,
                    similarity = best.similarity,
                    index = best.index,
                    "matched"
                );
                best.name
            }
            _ => UNKNOWN_NAME.to_string(),
        }
    }

    /// Drop any partially collected identity.
    pub fn reset_tracking(&mut self) -> OutboundEvent {
        self.pending.clear();
        OutboundEvent::RecognitionReset
    }

    /// Load the stored gallery and report its distinct names.
    ///
    /// A failed load still reports, with an empty name list.
    pub async fn load_gallery(&mut self) -> Option<OutboundEvent> {
        let Some(engine) = self.engine.as_mut() else {
            tracing::debug!("gallery load before initialization; ignored");
            return None;
        };

        let names = match engine.load_gallery(GALLERY_FILE_NAME).await {
            Ok(()) => {
                let engine: &E = engine;
                let names = distinct_names(
                    (0..engine.descriptor_count()).filter_map(|i| engine.descriptor_name(i)),
                );
                if let Some(highest) = highest_generated_index(&names) {
                    self.person_counter = highest;
                }
                tracing::info!(
                    identities = names.len(),
                    counter = self.person_counter,
                    "gallery loaded"
                );
                names
            }
            Err(e) => {
                tracing::warn!(error = %e, "gallery load failed");
                Vec::new()
            }
        };

        Some(OutboundEvent::GalleryLoaded { names })
    }

    /// Persist the gallery. Only a successful save is reported.
    pub async fn save_gallery(&mut self) -> Option<OutboundEvent> {
        let Some(engine) = self.engine.as_ref() else {
            tracing::debug!("gallery save before initialization; ignored");
            return None;
        };

        match engine.save_gallery(GALLERY_FILE_NAME).await {
            Ok(()) => Some(OutboundEvent::GallerySaved),
            Err(e) => {
                tracing::warn!(error = %e, "gallery save failed");
                None
            }
        }
    }

    pub fn clear_gallery(&mut self) -> OutboundEvent {
        self.person_counter = 0;
        if let Some(engine) = self.engine.as_mut() {
            engine.reset_gallery();
        }
        self.pending.clear();
        OutboundEvent::GalleryCleared
    }

    /// Rename every descriptor whose current name is a key of `mapping`.
    pub fn change_name(&mut self, mapping: &HashMap<String, String>) -> OutboundEvent {
        if let Some(engine) = self.engine.as_mut() {
            let mut renamed = 0usize;
            for index in 0..engine.descriptor_count() {
                let new_name = engine
                    .descriptor_name(index)
                    .and_then(|current| mapping.get(current));
                if let Some(new_name) = new_name {
                    if engine.replace_descriptor_name(new_name, index) {
                        renamed += 1;
                    }
                }
            }
            tracing::info!(renamed, "gallery names changed");
        }
        OutboundEvent::NameChanged
    }
}

fn best_match<E: RecognitionEngine>(engine: &E, probe: &Descriptor) -> Option<Candidate> {
    if engine.descriptor_count() == 0 {
        return None;
    }
    engine.recognize(probe, 1).into_iter().next()
}

/// Highest `N` among names of the exact form `Person<N>`.
///
/// Custom names, including ones that happen to end in digits, are ignored,
/// as are suffixes too large to be followed by another generated name.
pub fn highest_generated_index(names: &[String]) -> Option<u32> {
    names
        .iter()
        .filter_map(|name| {
            let digits = name.strip_prefix(GENERATED_NAME_PREFIX)?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse::<u32>().ok()
        })
        .filter(|n| n.checked_add(1).is_some())
        .max()
}
