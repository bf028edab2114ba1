use bevy::math::Vec2;
use rand::Rng;
use std::collections::VecDeque;

use super::noise::{random_seed_offset, NoiseField};
use super::surface::TerrainSurface;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSegment {
    pub top: Vec2,
    pub bottom: Vec2,
    pub x: f32,
}

pub trait SegmentSink {
    fn segment_generated(&mut self, x: f32, y: f32);
}

impl SegmentSink for () {
    fn segment_generated(&mut self, _x: f32, _y: f32) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSettings {
    pub chunk_size: u32,
    pub generation_threshold: f32,
    pub destroy_threshold: f32,
    pub segment_length: f32,
    pub ground_depth: f32,
    pub uv_scale: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamTickReport {
    pub generated: usize,
    pub retired: usize,
}

impl StreamTickReport {
    pub fn changed(&self) -> bool {
        self.generated > 0 || self.retired > 0
    }
}

pub struct TerrainStream {
    settings: StreamSettings,
    noise: NoiseField,
    segments: VecDeque<TerrainSegment>,
    frontier_x: f32,
    surface: TerrainSurface,
    revision: u64,
}

impl TerrainStream {
    pub fn new(settings: StreamSettings, noise: NoiseField) -> Self {
        debug_assert!(settings.chunk_size > 0);
        Self {
            settings,
            noise,
            segments: VecDeque::new(),
            frontier_x: 0.0,
            surface: TerrainSurface::default(),
            revision: 0,
        }
    }

    pub fn initialize(
        &mut self,
        initial_segment_count: u32,
        rng: &mut impl Rng,
        sink: &mut impl SegmentSink,
    ) {
        self.segments.clear();
        self.frontier_x = 0.0;
        self.noise.reseed(random_seed_offset(rng));
        self.append_segments(initial_segment_count, sink);
        self.rebuild_surface();
    }

    pub fn tick(&mut self, player_x: f32, sink: &mut impl SegmentSink) -> StreamTickReport {
        let mut report = StreamTickReport::default();

        while player_x + self.settings.generation_threshold > self.frontier_x {
            report.generated += self.append_segments(self.settings.chunk_size, sink);
        }
        report.retired = self.retire_behind(player_x);

        if report.changed() {
            self.rebuild_surface();
        }
        report
    }

    pub fn generate_chunk(&mut self, count: u32, sink: &mut impl SegmentSink) {
        if self.append_segments(count, sink) > 0 {
            self.rebuild_surface();
        }
    }

    pub fn rebuild_surface(&mut self) {
        self.surface = TerrainSurface::from_segments(self.segments.iter(), self.settings.uv_scale);
        self.revision += 1;
    }

    fn append_segments(&mut self, count: u32, sink: &mut impl SegmentSink) -> usize {
        for _ in 0..count {
            let x = self.frontier_x;
            let y = self.noise.height(x);
            debug_assert!(self.segments.back().is_none_or(|last| last.x < x));

            self.segments.push_back(TerrainSegment {
                top: Vec2::new(x, y),
                bottom: Vec2::new(x, y - self.settings.ground_depth),
                x,
            });
            sink.segment_generated(x, y);
            self.frontier_x += self.settings.segment_length;
        }
        count as usize
    }

    fn retire_behind(&mut self, player_x: f32) -> usize {
        let threshold_x = player_x - self.settings.destroy_threshold;
        let before = self.segments.len();
        self.segments.retain(|segment| segment.x >= threshold_x);
        before - self.segments.len()
    }

    pub fn segments(&self) -> &VecDeque<TerrainSegment> {
        &self.segments
    }

    pub fn frontier_x(&self) -> f32 {
        self.frontier_x
    }

    pub fn surface(&self) -> &TerrainSurface {
        &self.surface
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn surface_height_at(&self, x: f32) -> Option<f32> {
        let first = self.segments.front()?;
        let last = self.segments.back()?;
        if !x.is_finite() || x < first.x || x > last.x {
            return None;
        }

        let right = self.segments.partition_point(|segment| segment.x < x);
        if self.segments[right].x == x {
            return Some(self.segments[right].top.y);
        }
        let a = self.segments[right - 1].top;
        let b = self.segments[right].top;
        let span = (b.x - a.x).max(f32::EPSILON);
        Some(a.y + (b.y - a.y) * ((x - a.x) / span))
    }
}

#[cfg(test)]
mod tests {
    use super::super::noise::NoiseParams;
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[derive(Default)]
    struct RecordingSink {
        xs: Vec<f32>,
    }

    impl SegmentSink for RecordingSink {
        fn segment_generated(&mut self, x: f32, _y: f32) {
            self.xs.push(x);
        }
    }

    fn settings() -> StreamSettings {
        StreamSettings {
            chunk_size: 50,
            generation_threshold: 50.0,
            destroy_threshold: 100.0,
            segment_length: 1.0,
            ground_depth: 10.0,
            uv_scale: 0.5,
        }
    }

    fn noise(amplitude: f32) -> NoiseField {
        NoiseField::new(
            NoiseParams {
                scale: 0.05,
                amplitude,
                octaves: 2,
                persistence: 0.5,
                lacunarity: 2.0,
            },
            0.0,
        )
    }

    fn assert_sorted(stream: &TerrainStream) {
        let segments = stream.segments();
        for pair in segments.iter().collect::<Vec<_>>().windows(2) {
            assert!(pair[0].x < pair[1].x);
            assert!((pair[1].x - pair[0].x - 1.0).abs() < 1e-4);
        }
    }

    fn initialized_stream(initial: u32) -> TerrainStream {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut stream = TerrainStream::new(settings(), noise(5.0));
        stream.initialize(initial, &mut rng, &mut ());
        stream
    }

    #[test]
    fn initialize_generates_from_origin() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut sink = RecordingSink::default();
        let mut stream = TerrainStream::new(settings(), noise(5.0));
        stream.initialize(100, &mut rng, &mut sink);

        assert_eq!(stream.segments().len(), 100);
        assert_eq!(stream.segments()[0].x, 0.0);
        assert_eq!(stream.frontier_x(), 100.0);
        assert_eq!(sink.xs.len(), 100);
        assert_eq!(stream.surface().boundary.len(), 100);
        assert_sorted(&stream);
    }

    #[test]
    fn segment_bottom_sits_ground_depth_below_top() {
        let stream = initialized_stream(20);
        for segment in stream.segments() {
            assert_eq!(segment.top.x, segment.x);
            assert_eq!(segment.bottom.x, segment.x);
            assert!((segment.top.y - segment.bottom.y - 10.0).abs() < 1e-4);
        }
    }

    #[test]
    fn chunk_cleanup_keeps_exactly_the_window() {
        let mut stream = TerrainStream::new(settings(), noise(5.0));
        stream.generate_chunk(200, &mut ());
        assert_eq!(stream.segments().len(), 200);

        let report = stream.tick(150.0, &mut ());

        assert_eq!(report.generated, 0);
        assert_eq!(report.retired, 50);
        assert!(stream.segments().iter().all(|segment| segment.x >= 50.0));
        assert_eq!(stream.segments().front().map(|segment| segment.x), Some(50.0));
        assert_eq!(stream.segments().len(), 150);
        assert_eq!(stream.surface().boundary.len(), 150);
    }

    #[test]
    fn tick_generates_one_chunk_when_near_frontier() {
        let mut stream = initialized_stream(100);
        let mut sink = RecordingSink::default();

        let report = stream.tick(60.0, &mut sink);

        assert_eq!(report.generated, 50);
        assert_eq!(sink.xs.first().copied(), Some(100.0));
        assert_eq!(stream.frontier_x(), 150.0);
    }

    #[test]
    fn window_invariant_holds_while_driving() {
        let mut stream = initialized_stream(100);
        let mut player_x = 0.0;

        for _ in 0..2_000 {
            player_x += 0.37;
            let revision_before = stream.revision();
            let report = stream.tick(player_x, &mut ());

            assert!(stream.frontier_x() - player_x >= 50.0);
            assert!(stream
                .segments()
                .iter()
                .all(|segment| segment.x >= player_x - 100.0 - 1.0));
            assert_sorted(&stream);
            assert_eq!(stream.surface().boundary.len(), stream.segments().len());
            if report.changed() {
                assert!(stream.revision() > revision_before);
            }
        }
    }

    #[test]
    fn large_jump_still_fills_window() {
        let mut stream = initialized_stream(100);
        stream.tick(1_000.0, &mut ());

        assert!(stream.frontier_x() - 1_000.0 >= 50.0);
        assert!(stream.segments().iter().all(|segment| segment.x >= 900.0));
        assert_sorted(&stream);
    }

    #[test]
    fn surface_height_interpolates_between_tops() {
        let stream = initialized_stream(10);
        let a = stream.segments()[3].top.y;
        let b = stream.segments()[4].top.y;

        let mid = stream.surface_height_at(3.5).expect("inside window");
        assert!((mid - (a + b) * 0.5).abs() < 1e-4);
        assert_eq!(stream.surface_height_at(3.0), Some(a));
        assert_eq!(stream.surface_height_at(-1.0), None);
        assert_eq!(stream.surface_height_at(50.0), None);
    }

    #[test]
    fn zero_count_generates_nothing() {
        let mut sink = RecordingSink::default();
        let mut stream = TerrainStream::new(settings(), noise(5.0));
        stream.generate_chunk(0, &mut sink);

        assert!(stream.segments().is_empty());
        assert_eq!(stream.frontier_x(), 0.0);
        assert!(sink.xs.is_empty());

        let stream = initialized_stream(0);
        assert!(stream.segments().is_empty());
        assert_eq!(stream.frontier_x(), 0.0);
        assert!(stream.surface().is_empty());
    }

    #[test]
    fn surface_height_rejects_non_finite_x() {
        let stream = initialized_stream(10);
        assert_eq!(stream.surface_height_at(f32::NAN), None);
        assert_eq!(stream.surface_height_at(f32::INFINITY), None);
    }

    #[test]
    fn empty_stream_has_empty_surface() {
        let mut stream = TerrainStream::new(settings(), noise(5.0));
        stream.rebuild_surface();
        assert!(stream.surface().is_empty());
        assert_eq!(stream.surface_height_at(0.0), None);
    }
}
