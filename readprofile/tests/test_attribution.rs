use readprofile::analysis::{attribute, AbsoluteSymbolPolicy, RangeSamples, RangeSink};
use readprofile::domain::ProfileError;
use readprofile::profiling::{swap_byte_order, LoadOptions, SampleBuffer};
use readprofile::symbolization::SymbolMapReader;
use std::io::Cursor;

/// Keeps per-range ticks and the sum of per-bin counters
#[derive(Default)]
struct Totals {
    ranges: Vec<(String, u64)>,
    bin_sum: u64,
}

impl RangeSink for Totals {
    fn record(&mut self, range: &RangeSamples<'_>) -> Result<(), ProfileError> {
        let per_bin: u64 = range.bins().map(|(_, count)| u64::from(count)).sum();
        assert_eq!(per_bin, range.ticks, "counters of {} must add up", range.name);
        self.bin_sum += per_bin;
        self.ranges.push((range.name.to_string(), range.ticks));
        Ok(())
    }
}

/// Small deterministic generator so failures are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

/// Build a buffer and a matching map with `functions` text symbols
fn synthetic(seed: u64, functions: usize, step: u32) -> (Vec<u32>, String) {
    let mut rng = Lcg(seed);
    let base = 0xffff_ffff_8100_0000u64;
    let mut map = format!("{base:016x} T _stext\n");
    let mut addr = base;
    for i in 0..functions {
        // Some symbols share an address (zero-length ranges)
        addr += (rng.next() % 8) * u64::from(step);
        map.push_str(&format!("{addr:016x} t func_{i}\n"));
    }
    addr += u64::from(step);
    map.push_str(&format!("{addr:016x} T _etext\n"));
    map.push_str(&format!("{:016x} D init_task\n", addr + 0x1000));

    let text_bins = usize::try_from((addr - base) / u64::from(step)).unwrap();
    let mut elements = vec![step];
    elements.extend((0..text_bins).map(|_| u32::try_from(rng.next() % 50).unwrap()));
    (elements, map)
}

fn run(elements: Vec<u32>, map: &str, options: LoadOptions) -> (Totals, readprofile::analysis::Summary) {
    let buffer = SampleBuffer::from_elements(elements, options).unwrap();
    let mut symbols = SymbolMapReader::new(Cursor::new(map.as_bytes().to_vec()), "System.map");
    let start = symbols.find_text_start().unwrap();
    let mut totals = Totals::default();
    let summary =
        attribute(&buffer, start, &mut symbols, AbsoluteSymbolPolicy::default(), &mut totals)
            .expect("attribution failed");
    (totals, summary)
}

#[test]
fn test_attribution_partitions_bins() {
    for seed in 1..20 {
        let (elements, map) = synthetic(seed, 40, 4);
        let all_bins: u64 = elements[1..].iter().map(|&v| u64::from(v)).sum();

        let (totals, summary) = run(elements.clone(), &map, LoadOptions { detect_byte_order: false });
        let attributed: u64 = totals.ranges.iter().map(|(_, t)| t).sum();
        let untouched: u64 = elements[summary.next_bin..elements.len() - 1]
            .iter()
            .map(|&v| u64::from(v))
            .sum();

        assert_eq!(attributed, summary.total_ticks);
        assert_eq!(totals.bin_sum, summary.total_ticks);
        assert_eq!(
            attributed + u64::from(summary.unknown) + untouched,
            all_bins,
            "seed {seed}: bins must be partitioned"
        );
        // _stext plus every func_N range
        assert_eq!(summary.ranges, 41);
    }
}

#[test]
fn test_reversed_snapshot_gives_same_attribution() {
    let (elements, map) = synthetic(7, 25, 16);
    let (native, native_summary) = run(elements.clone(), &map, LoadOptions::default());

    let mut reversed = elements;
    swap_byte_order(&mut reversed);
    let (swapped, swapped_summary) = run(reversed, &map, LoadOptions::default());

    assert_eq!(native.ranges, swapped.ranges);
    assert_eq!(native_summary, swapped_summary);
}

#[test]
fn test_out_of_range_map_is_rejected() {
    let buffer =
        SampleBuffer::from_elements(vec![4, 1, 1, 0], LoadOptions::default()).unwrap();
    let map = "1000 T _stext\n1004 T a\n1100 T _etext\n";
    let mut symbols = SymbolMapReader::new(Cursor::new(map.as_bytes().to_vec()), "System.map");
    let start = symbols.find_text_start().unwrap();

    let err = attribute(
        &buffer,
        start,
        &mut symbols,
        AbsoluteSymbolPolicy::default(),
        &mut Totals::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "profile address out of range. Wrong map file?");
}
