use crate::scene::model::{NodeId, SceneTree};

/// Single authority for the instant being rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimelineClock {
    now_ms: u64,
}

impl TimelineClock {
    pub fn now_ms(self) -> u64 {
        self.now_ms
    }

    pub fn set_instant(&mut self, instant_ms: u64) {
        self.now_ms = instant_ms;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Visual,
    Animation,
    Audio,
}

/// A window on the timeline, optionally bound to a scene node or an audio file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    pub start_ms: u64,
    pub duration_ms: u64,
    #[serde(default)]
    pub node: Option<NodeId>,
    /// Source file for audio clips.
    #[serde(default)]
    pub media_uri: Option<String>,
}

impl Clip {
    pub fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }

    /// Half-open `[start, end)` containment.
    pub fn contains(&self, instant_ms: u64) -> bool {
        instant_ms >= self.start_ms && instant_ms < self.end_ms()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Track {
    pub kind: TrackKind,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// Clip tracks plus the clock that drives them.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    pub clock: TimelineClock,
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            clock: TimelineClock::default(),
            tracks,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn set_instant(&mut self, instant_ms: u64) {
        self.clock.set_instant(instant_ms);
    }

    /// Latest clip end over every track, 0 without clips.
    pub fn end_ms(&self) -> u64 {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(Clip::end_ms)
            .max()
            .unwrap_or(0)
    }

    /// Gate node visibility by visual clip windows at the current instant.
    ///
    /// Nodes not referenced by any visual clip keep their visibility.
    pub fn apply_visibility(&self, tree: &mut SceneTree) {
        let now = self.now_ms();
        let mut gated: Vec<(NodeId, bool)> = Vec::new();
        for clip in self
            .tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Visual)
            .flat_map(|t| t.clips.iter())
        {
            let Some(node) = clip.node else {
                continue;
            };
            let inside = clip.contains(now);
            match gated.iter_mut().find(|(n, _)| *n == node) {
                Some((_, vis)) => *vis |= inside,
                None => gated.push((node, inside)),
            }
        }

        for (id, vis) in gated {
            let changed = tree.get(id).is_some_and(|n| n.visible != vis);
            if changed && let Some(node) = tree.get_mut(id) {
                node.visible = vis;
            }
        }
    }

    /// Audio file muxed into video exports: first clip of the first unmuted audio track.
    pub fn audio_source(&self) -> Option<&str> {
        self.tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Audio && !t.muted)
            .flat_map(|t| t.clips.iter())
            .find_map(|c| c.media_uri.as_deref())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/clock.rs"]
mod tests;
