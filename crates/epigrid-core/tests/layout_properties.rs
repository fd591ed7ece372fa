use std::collections::HashSet;

use epigrid_core::{
    BandAccountant, BandSizes, Compartment, EventLog, Fractions, HybridConfig, LADDER,
    LadderRounding, LayoutConfig, LayoutEngine, LayoutMode, ParamsSeed, PointerUpdate, Rgba,
    SeriesFrame, Surface,
};
use rand::{Rng, SeedableRng, rngs::SmallRng};

const MODES: [LayoutMode; 4] = [
    LayoutMode::Wave,
    LayoutMode::Proportional,
    LayoutMode::Cluster,
    LayoutMode::Hybrid,
];

/// One pixel per grid cell.
struct CellSurface {
    size: u32,
    pixels: Vec<Rgba>,
}

impl CellSurface {
    fn new(size: u32) -> Self {
        Self {
            size,
            pixels: vec![Rgba([0, 0, 0, 0]); (size * size) as usize],
        }
    }

    fn count(&self, color: Rgba) -> usize {
        self.pixels.iter().filter(|&&p| p == color).count()
    }
}

impl Surface for CellSurface {
    fn size(&self) -> (u32, u32) {
        (self.size, self.size)
    }

    fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    fn set_pixel_block(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba) {
        for py in y..(y + height).min(self.size) {
            for px in x..(x + width).min(self.size) {
                self.pixels[(py * self.size + px) as usize] = color;
            }
        }
    }
}

fn engine_with(size: u32, rounding: LadderRounding) -> LayoutEngine<CellSurface, EventLog> {
    let config = LayoutConfig {
        grid_size: size,
        ladder_rounding: rounding,
        ..LayoutConfig::default()
    };
    LayoutEngine::with_observer(config, CellSurface::new(size), EventLog::default())
        .expect("engine")
}

fn engine(size: u32) -> LayoutEngine<CellSurface, EventLog> {
    engine_with(size, LadderRounding::default())
}

fn ranking_for(size: u32, seed: &str, mode: LayoutMode) -> Vec<usize> {
    let mut engine = engine(size);
    engine.on_params(ParamsSeed::new(seed).with_mode(mode));
    engine.ranking().expect("seeded").order().to_vec()
}

fn random_fractions(rng: &mut SmallRng) -> Fractions {
    let mut f = Fractions::sir(rng.random(), rng.random(), rng.random());
    if rng.random_bool(0.5) {
        f = f.with_exposed(rng.random());
    }
    if rng.random_bool(0.3) {
        f = f.with_deceased(rng.random::<f64>() * 0.2);
    }
    if rng.random_bool(0.4) {
        f = f.with_vaccinated(rng.random());
    }
    f.normalized()
}

#[test]
fn identical_seeds_give_bit_identical_layouts() {
    for mode in MODES {
        for seed in ["run-1", "", "beta=0.3;gamma=0.1", "ünïcode"] {
            let mut a = engine(24);
            let mut b = engine(24);
            a.on_params(ParamsSeed::new(seed).with_mode(mode));
            b.on_params(ParamsSeed::new(seed).with_mode(mode));
            let bits = |metric: &[f64]| metric.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
            assert_eq!(
                bits(a.metric().expect("metric")),
                bits(b.metric().expect("metric")),
                "{mode} metric diverged for seed {seed:?}"
            );
            assert_eq!(a.ranking(), b.ranking());
        }
    }
}

#[test]
fn rankings_are_permutations_for_every_mode_and_size() {
    for size in [8_u32, 9, 13, 32] {
        for mode in MODES {
            let order = ranking_for(size, "perm", mode);
            let n = (size * size) as usize;
            assert_eq!(order.len(), n);
            let unique: HashSet<usize> = order.iter().copied().collect();
            assert_eq!(unique.len(), n, "{mode} duplicated cells at size {size}");
            assert!(order.iter().all(|&cell| cell < n));
        }
    }
}

#[test]
fn band_sizes_never_exceed_the_grid() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    for rounding in [LadderRounding::PerBand, LadderRounding::Cumulative] {
        let mut accountant = BandAccountant::new(144, rounding);
        for _ in 0..5_000 {
            let sizes = accountant.step(&random_fractions(&mut rng));
            assert!(sizes.drawn_total() <= 144, "{rounding:?} overflowed: {sizes:?}");
            assert_eq!(sizes.cell_count(), 144);
        }
    }
}

#[test]
fn per_band_counts_stay_within_one_cell_of_target() {
    let mut rng = SmallRng::seed_from_u64(42);
    let cells = 256;
    let mut accountant = BandAccountant::new(cells, LadderRounding::PerBand);
    for _ in 0..5_000 {
        // Keep at least a tenth susceptible so the grid cap never bites.
        let raw = random_fractions(&mut rng);
        let scale = 0.9 * (1.0 - raw.susceptible);
        let f = Fractions {
            susceptible: 1.0 - scale,
            exposed: raw.exposed.map(|v| v * 0.9),
            infectious: raw.infectious * 0.9,
            recovered: raw.recovered.map(|v| v * 0.9),
            deceased: raw.deceased.map(|v| v * 0.9),
            vaccinated: raw.vaccinated.map(|v| v * 0.9),
        }
        .normalized();
        let sizes = accountant.step(&f);
        for compartment in [
            Compartment::Recovered,
            Compartment::Deceased,
            Compartment::Infectious,
            Compartment::Exposed,
            Compartment::Vaccinated,
        ] {
            let target = f.get(compartment) * cells as f64;
            let error = (sizes.get(compartment) as f64 - target).abs();
            assert!(error < 1.0 + 1e-9, "{compartment} off by {error}");
        }
    }
}

#[test]
fn constant_fraction_has_no_long_run_drift() {
    let cells = 100;
    let f = 0.1234;
    for frames in [100_usize, 1_000, 10_000] {
        let mut accountant = BandAccountant::new(cells, LadderRounding::PerBand);
        let total: usize = (0..frames)
            .map(|_| accountant.step(&Fractions::sir(1.0 - f, f, 0.0)).infectious)
            .sum();
        let mean = total as f64 / frames as f64;
        assert!(
            (mean - f * cells as f64).abs() <= 1.0 / frames as f64 + 1e-9,
            "mean {mean} drifted over {frames} frames"
        );
    }
}

#[test]
fn constant_series_frames_average_to_target() {
    let steps = 2_000;
    let samples = vec![Fractions::sir(0.6, 0.157, 0.243); steps];
    let series = SeriesFrame::from_samples((0..steps).map(|i| i as f64).collect(), &samples);
    let mut engine = engine(10);
    engine.on_params(ParamsSeed::new("drift").with_mode(LayoutMode::Cluster));
    engine.on_sim_data(series).expect("series");
    let mut infectious = 0;
    for idx in 0..steps {
        infectious += engine
            .on_update(&PointerUpdate::index(idx as i64))
            .expect("frame")
            .infectious;
    }
    let mean = infectious as f64 / steps as f64;
    assert!((mean - 15.7).abs() < 0.01, "mean infectious {mean}");
}

#[test]
fn claimed_cells_are_always_a_ranking_prefix() {
    let steps = 120;
    let samples: Vec<Fractions> = (0..steps)
        .map(|i| {
            let reached = (i as f64 / steps as f64).powf(0.7) * 0.85;
            let infectious = reached * 0.3;
            Fractions::sir(1.0 - reached, infectious, reached - infectious)
        })
        .collect();
    let series = SeriesFrame::from_samples((0..steps).map(|i| i as f64).collect(), &samples);

    for rounding in [LadderRounding::PerBand, LadderRounding::Cumulative] {
        let mut engine = engine_with(20, rounding);
        engine.on_params(ParamsSeed::new("ratchet").with_mode(LayoutMode::Hybrid));
        engine.on_sim_data(series.clone()).expect("series");
        let order = engine.ranking().expect("ranking").order().to_vec();

        let mut previous: Option<HashSet<usize>> = None;
        let mut most_claimed = 0;
        for idx in 0..steps {
            let sizes = engine.on_update(&PointerUpdate::index(idx as i64)).expect("frame");
            let claimed: HashSet<usize> = (0..order.len())
                .filter(|&cell| engine.compartment_of(cell) != Some(Compartment::Susceptible))
                .collect();
            let prefix: HashSet<usize> = order[..sizes.ladder_total()].iter().copied().collect();
            assert_eq!(claimed, prefix, "frame {idx} claimed a non-prefix set");

            if let Some(before) = &previous {
                let (small, large) = if before.len() <= claimed.len() {
                    (before, &claimed)
                } else {
                    (&claimed, before)
                };
                assert!(small.is_subset(large), "frame {idx} swapped claimed cells");
            }

            if rounding == LadderRounding::Cumulative {
                let target = (1.0 - samples[idx].susceptible) * order.len() as f64;
                let error = (claimed.len() as f64 - target).abs();
                assert!(error < 1.0 + 1e-9, "frame {idx} claimed region off by {error}");
                assert!(
                    claimed.len() + 1 >= most_claimed,
                    "frame {idx} gave back {} cells",
                    most_claimed - claimed.len()
                );
            }
            most_claimed = most_claimed.max(claimed.len());
            previous = Some(claimed);
        }
    }
}

#[test]
fn claimed_region_is_stable_while_infectious_drains_into_recovered() {
    let mut engine = engine(10);
    engine.on_params(ParamsSeed::new("drain").with_mode(LayoutMode::Cluster));
    let mut first: Option<Vec<usize>> = None;
    for step in 0..=50 {
        let infectious = 0.3 * (1.0 - f64::from(step) / 50.0);
        let sizes = engine
            .on_update(&PointerUpdate::inline(Fractions::sir(0.7, infectious, 0.3 - infectious)))
            .expect("frame");
        assert_eq!(sizes.ladder_total(), 30, "step {step}");
        let claimed: Vec<usize> = (0..100)
            .filter(|&cell| engine.compartment_of(cell) != Some(Compartment::Susceptible))
            .collect();
        match &first {
            Some(cells) => assert_eq!(&claimed, cells, "step {step} moved the claimed region"),
            None => first = Some(claimed),
        }
    }
}

#[test]
fn cumulative_boundaries_stay_within_one_cell_of_target() {
    let mut rng = SmallRng::seed_from_u64(7);
    let cells = 256;
    let mut accountant = BandAccountant::new(cells, LadderRounding::Cumulative);
    for _ in 0..5_000 {
        let raw = random_fractions(&mut rng);
        let f = Fractions {
            susceptible: 0.1 + 0.9 * raw.susceptible,
            exposed: raw.exposed.map(|v| v * 0.9),
            infectious: raw.infectious * 0.9,
            recovered: raw.recovered.map(|v| v * 0.9),
            deceased: raw.deceased.map(|v| v * 0.9),
            vaccinated: raw.vaccinated.map(|v| v * 0.9),
        }
        .normalized();
        let sizes = accountant.step(&f);
        let mut target = 0.0;
        let mut claimed = 0;
        for compartment in LADDER {
            target += f.get(compartment) * cells as f64;
            claimed += sizes.get(compartment);
            let error = (claimed as f64 - target).abs();
            assert!(error < 1.0 + 1e-9, "boundary through {compartment} off by {error}");
        }
        let error = (sizes.vaccinated as f64 - f.vaccinated.unwrap_or(0.0) * cells as f64).abs();
        assert!(error < 1.0 + 1e-9, "vaccinated off by {error}");
    }
}

#[test]
fn wave_scenario_puts_recovered_at_the_centre() {
    let mut engine = engine(10);
    engine.on_params(ParamsSeed::new("run-1").with_mode(LayoutMode::Wave));
    let sizes = engine
        .on_update(&PointerUpdate::inline(Fractions::sir(0.7, 0.2, 0.1)))
        .expect("frame");
    assert_eq!(sizes.recovered, 10);
    assert_eq!(sizes.infectious, 20);
    assert_eq!(sizes.susceptible, 70);

    let order = engine.ranking().expect("ranking").order().to_vec();
    let metric = engine.metric().expect("metric").to_vec();
    let palette = engine.config().palette;
    let recovered: HashSet<usize> = order[..10].iter().copied().collect();
    let worst_recovered = recovered.iter().map(|&c| metric[c]).fold(f64::MIN, f64::max);
    let best_other = (0..100)
        .filter(|c| !recovered.contains(c))
        .map(|c| metric[c])
        .fold(f64::MAX, f64::min);
    assert!(worst_recovered <= best_other);
    for cell in 0..100 {
        let expected = if recovered.contains(&cell) {
            palette.recovered
        } else if order[10..30].contains(&cell) {
            palette.infectious
        } else {
            palette.susceptible
        };
        assert_eq!(engine.surface().pixels[cell], expected, "cell {cell}");
    }
}

#[test]
fn proportional_layouts_differ_between_seeds() {
    let a = ranking_for(32, "a", LayoutMode::Proportional);
    let b = ranking_for(32, "b", LayoutMode::Proportional);
    let matches = a.iter().zip(&b).filter(|(x, y)| x == y).count();
    assert!(matches * 100 < a.len(), "{matches} of {} positions coincide", a.len());
}

#[test]
fn hybrid_with_closed_gate_matches_wave() {
    let mut hybrid = engine(16);
    hybrid.on_params(
        ParamsSeed::new("gate")
            .with_mode(LayoutMode::Hybrid)
            .with_hybrid(HybridConfig {
                d0: 1.0,
                p: 2.0,
                blur_passes: 3,
            }),
    );
    let wave = ranking_for(16, "gate", LayoutMode::Wave);
    assert_eq!(hybrid.ranking().expect("ranking").order(), wave.as_slice());
}

#[test]
fn vaccinated_band_comes_from_the_far_end() {
    let mut engine = engine(12);
    engine.on_params(ParamsSeed::new("sirv").with_mode(LayoutMode::Cluster));
    let sizes = engine
        .on_update(&PointerUpdate::inline(
            Fractions::sir(0.5, 0.1, 0.15).with_vaccinated(0.25),
        ))
        .expect("frame");
    assert_eq!(sizes.vaccinated, 36);
    let order = engine.ranking().expect("ranking").order().to_vec();
    for &cell in &order[order.len() - sizes.vaccinated..] {
        assert_eq!(engine.compartment_of(cell), Some(Compartment::Vaccinated));
    }
    for &cell in &order[..sizes.ladder_total()] {
        assert_ne!(engine.compartment_of(cell), Some(Compartment::Vaccinated));
    }
    let palette = engine.config().palette;
    assert_eq!(engine.surface().count(palette.vaccinated), 36);
}

#[test]
fn seir_frames_paint_every_band() {
    let mut engine = engine_with(10, LadderRounding::Cumulative);
    engine.on_params(ParamsSeed::new("seir").with_mode(LayoutMode::Wave));
    let sizes = engine
        .on_update(&PointerUpdate::inline(
            Fractions::sir(0.4, 0.2, 0.3).with_exposed(0.1),
        ))
        .expect("frame");
    let palette = engine.config().palette;
    let surface = engine.surface();
    assert_eq!(surface.count(palette.recovered), sizes.recovered);
    assert_eq!(surface.count(palette.infectious), sizes.infectious);
    assert_eq!(surface.count(palette.exposed), sizes.exposed);
    assert_eq!(surface.count(palette.susceptible), sizes.susceptible);
    assert_eq!(sizes.recovered + sizes.infectious + sizes.exposed, 60);
}

#[test]
fn sird_frames_put_deceased_between_recovered_and_infectious() {
    let mut engine = engine(10);
    engine.on_params(ParamsSeed::new("sird").with_mode(LayoutMode::Wave));
    let sizes = engine
        .on_update(&PointerUpdate::inline(
            Fractions::sir(0.5, 0.2, 0.2).with_deceased(0.1),
        ))
        .expect("frame");
    assert_eq!(
        (sizes.recovered, sizes.deceased, sizes.infectious),
        (20, 10, 20)
    );

    let order = engine.ranking().expect("ranking").order().to_vec();
    let expected = [
        (Compartment::Recovered, 0..20),
        (Compartment::Deceased, 20..30),
        (Compartment::Infectious, 30..50),
        (Compartment::Susceptible, 50..100),
    ];
    for (compartment, positions) in expected {
        for position in positions {
            assert_eq!(
                engine.compartment_of(order[position]),
                Some(compartment),
                "ranking position {position}"
            );
        }
    }
    let palette = engine.config().palette;
    assert_eq!(engine.surface().count(palette.deceased), 10);
    assert_eq!(engine.surface().count(palette.recovered), 20);
}

#[test]
fn frame_events_mirror_returned_sizes() {
    let mut engine = engine(8);
    engine.on_params(ParamsSeed::new("events"));
    let mut returned: Vec<BandSizes> = Vec::new();
    for step in 0..5 {
        let f = Fractions::sir(0.9 - step as f64 * 0.1, 0.1, step as f64 * 0.1);
        returned.push(engine.on_update(&PointerUpdate::inline(f)).expect("frame"));
    }
    let logged: Vec<BandSizes> = engine.observer().frames().copied().collect();
    assert_eq!(logged, returned);
}
