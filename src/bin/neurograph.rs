//! Demo driver for the neurograph engine.
//!
//! Builds an array, wires a reproducible random graph, registers a
//! stimulator module, runs a number of ticks, and reports activity.
//!
//! Examples:
//!   neurograph
//!   neurograph --capacity 100000 --rows 1000 --ticks 500
//!   neurograph --seed 7 --save run.ngraph
//!
//! Build with `--features cli` (and `--features parallel` for the rayon
//! phase passes).

use std::process;

use tracing::info;

use neurograph::prelude::*;
use neurograph::prng::Prng;
use neurograph::storage;

struct Options {
    capacity: usize,
    rows: usize,
    ticks: u64,
    synapses_per_neuron: usize,
    seed: u64,
    save: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            rows: 100,
            ticks: 100,
            synapses_per_neuron: 4,
            seed: 1,
            save: None,
        }
    }
}

fn usage() -> ! {
    eprintln!("neurograph demo driver\n");
    eprintln!("Options:");
    eprintln!("  --capacity <n>    neuron count (default 10000)");
    eprintln!("  --rows <n>        grid rows (default 100)");
    eprintln!("  --ticks <n>       generations to run (default 100)");
    eprintln!("  --synapses <n>    random synapses per neuron (default 4)");
    eprintln!("  --seed <n>        wiring/stimulus seed (default 1)");
    eprintln!("  --save <path>     write a snapshot after the run");
    process::exit(1);
}

fn parse_options() -> Options {
    let mut opts = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let mut value = || args.next().unwrap_or_else(|| usage());
        match flag.as_str() {
            "--capacity" => opts.capacity = value().parse().unwrap_or_else(|_| usage()),
            "--rows" => opts.rows = value().parse().unwrap_or_else(|_| usage()),
            "--ticks" => opts.ticks = value().parse().unwrap_or_else(|_| usage()),
            "--synapses" => opts.synapses_per_neuron = value().parse().unwrap_or_else(|_| usage()),
            "--seed" => opts.seed = value().parse().unwrap_or_else(|_| usage()),
            "--save" => opts.save = Some(value()),
            _ => usage(),
        }
    }
    opts
}

/// Per-tick hook that keeps a trickle of activity flowing into the graph.
struct RandomStimulator {
    rng: Prng,
    per_tick: usize,
}

impl Module for RandomStimulator {
    fn fire(&mut self, array: &mut NeuronArray) {
        for _ in 0..self.per_tick {
            let target = self.rng.gen_range_usize(0, array.capacity());
            let amount = self.rng.gen_range_f32(0.5, 1.5);
            // Index came from capacity, so this cannot fail.
            let _ = array.stimulate(target, amount);
        }
    }
}

fn wire_random(array: &mut NeuronArray, rng: &mut Prng, per_neuron: usize) {
    let capacity = array.capacity();
    let models = [SynapseModel::Fixed, SynapseModel::Binary, SynapseModel::Hebbian];
    for source in 0..capacity {
        for _ in 0..per_neuron {
            let mut target = rng.gen_range_usize(0, capacity);
            if target == source {
                target = (target + 1) % capacity;
            }
            let weight = rng.gen_range_f32(0.2, 1.0);
            let model = models[rng.gen_range_usize(0, models.len())];
            array
                .add_synapse(source, target, weight, model)
                .expect("targets are drawn from [0, capacity)");
        }
    }
}

fn main() -> Result<(), GraphError> {
    tracing_subscriber::fmt::init();
    let opts = parse_options();

    let mut array = NeuronArray::new(ArrayConfig::with_size(opts.capacity, opts.rows))?;
    info!(
        capacity = array.capacity(),
        rows = array.rows(),
        "array constructed"
    );

    let mut rng = Prng::new(opts.seed);
    wire_random(&mut array, &mut rng, opts.synapses_per_neuron);
    info!(
        synapses = array.stats().live_synapses,
        "random wiring complete"
    );

    array.register_module(ModuleSlot::new(
        "stimulator",
        "stimulate random",
        Some(Box::new(RandomStimulator {
            rng: Prng::new(opts.seed ^ 0xA5A5_A5A5),
            per_tick: (opts.capacity / 100).max(1),
        })),
    ));

    let report_every = (opts.ticks / 10).max(1);
    for _ in 0..opts.ticks {
        array.tick();
        if array.generation() % report_every == 0 {
            let stats = array.stats();
            info!(
                generation = stats.generation,
                fired = stats.fire_count,
                fired_previous = stats.last_fire_count,
                "tick"
            );
        }
    }

    array.reconcile_graph();
    let stats = array.stats();
    info!(
        generation = stats.generation,
        live_synapses = stats.live_synapses,
        back_refs = stats.back_refs,
        "run complete"
    );

    if let Some(path) = opts.save {
        storage::save_to_file(&array, &path)?;
        info!(path = %path, "snapshot saved");
    }

    Ok(())
}
