// File: src/gp.rs
//
// Genetic programming over Push programs.
// A population holds one interpreter per program. Evaluation flushes each
// un-evaluated interpreter, pushes the program onto both the code and exec
// stacks and submits it to the runner; once everything has finished, the
// fitness callback scores the final interpreter state. Variation then
// repeatedly draws fitness-proportionate pairs, crosses their trees over
// at random points and point-mutates both, until fewer than two evaluated
// programs remain.
//
// Program trees are pinned in their interpreter's heap: they must survive
// stack flushes and the collections that run mid-evaluation. Crossover
// moves subtrees between interpreters by adoption (a deep copy that
// re-interns names and re-resolves instruction handles); the donor copy
// becomes garbage and is swept on the donor's next cycle.

use crate::interpreter::{code, random::random_value, Interpreter, PushType, Val};
use crate::vm::Vm;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

/// Called once per freshly created interpreter; register host
/// instructions and seed bindings here
pub type InitCallback = Box<dyn FnMut(&mut Interpreter) + Send>;

/// Called right before a program runs, after the flush
pub type PrepareCallback = Box<dyn FnMut(&mut Interpreter) + Send>;

/// Scores a finished run; receives the interpreter and the program tree
pub type FitnessCallback = Box<dyn FnMut(&mut Interpreter, Val) -> f64 + Send>;

/// Replaces the default one-point crossover
pub type CrossoverCallback = Box<dyn FnMut(&mut StdRng, &mut Program, &mut Program) + Send>;

/// Replaces the default point mutation
pub type MutateCallback = Box<dyn FnMut(&mut StdRng, &mut Program) + Send>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Selection {
    /// Draw directly proportional to fitness
    RouletteLinear,
    /// Sort by fitness and draw proportional to rank
    RouletteRanked,
}

#[derive(Clone, Copy, Debug)]
pub struct GpParams {
    pub population_size: usize,
    /// Point budget for each initial random program
    pub program_size: i64,
    pub threads: usize,
    /// Step budget per evaluation (0 = unbounded)
    pub max_steps: u64,
    /// 0 seeds from entropy
    pub seed: u64,
    pub selection: Selection,
}

impl Default for GpParams {
    fn default() -> Self {
        GpParams {
            population_size: 100,
            program_size: 50,
            threads: 4,
            max_steps: 10_000,
            seed: 0,
            selection: Selection::RouletteLinear,
        }
    }
}

pub struct GpCallbacks {
    pub init: Option<InitCallback>,
    pub prepare: Option<PrepareCallback>,
    pub fitness: FitnessCallback,
    pub crossover: Option<CrossoverCallback>,
    pub mutate: Option<MutateCallback>,
}

impl GpCallbacks {
    pub fn with_fitness(fitness: FitnessCallback) -> Self {
        GpCallbacks { init: None, prepare: None, fitness, crossover: None, mutate: None }
    }
}

/// One member of the population
pub struct Program {
    pub interp: Arc<Mutex<Interpreter>>,
    /// The program tree, pinned in its interpreter's heap
    pub code: Val,
    pub evaluated: bool,
    pub fitness: f64,
}

pub struct Population {
    pub programs: Vec<Program>,
    vm: Vm,
    rng: StdRng,
    params: GpParams,
    callbacks: GpCallbacks,
}

impl Population {
    pub fn new(params: GpParams, mut callbacks: GpCallbacks) -> Population {
        let mut rng = if params.seed != 0 {
            StdRng::seed_from_u64(params.seed)
        } else {
            StdRng::from_entropy()
        };
        let vm = Vm::new(params.threads, params.max_steps, None);

        let mut programs = Vec::with_capacity(params.population_size);
        for _ in 0..params.population_size {
            let mut interp = Interpreter::with_seed(rng.gen());
            let mut budget = params.program_size.max(1);
            let code = random_value(&mut interp, Some(PushType::Code), &mut budget, true);
            interp.heap.pin(code);
            if let Some(init) = callbacks.init.as_mut() {
                init(&mut interp);
            }
            programs.push(Program {
                interp: Arc::new(Mutex::new(interp)),
                code,
                evaluated: false,
                fitness: 0.0,
            });
        }

        Population { programs, vm, rng, params, callbacks }
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Run every un-evaluated program in parallel and score it
    pub fn evaluate(&mut self) {
        for program in &self.programs {
            if program.evaluated {
                continue;
            }
            {
                let mut interp = program.interp.lock().unwrap();
                interp.flush();
                if let Some(prepare) = self.callbacks.prepare.as_mut() {
                    prepare(&mut interp);
                }
                interp.stacks.code.push(program.code);
                interp.stacks.exec.push(program.code);
            }
            self.vm.submit(program.interp.clone());
        }
        self.vm.wait();

        for program in &mut self.programs {
            if program.evaluated {
                continue;
            }
            let mut interp = program.interp.lock().unwrap();
            program.fitness = (self.callbacks.fitness)(&mut interp, program.code);
            drop(interp);
            program.evaluated = true;
        }
    }

    /// One generation: evaluate, then select pairs and vary them until
    /// fewer than two evaluated programs remain
    pub fn generation(&mut self) {
        self.evaluate();
        while let Some(pair) = self.select(2) {
            let (first, second) = (pair[0], pair[1]);
            self.crossover(first, second);
            self.mutate(first);
            self.mutate(second);
            self.programs[first].evaluated = false;
            self.programs[second].evaluated = false;
        }
    }

    /// The evaluated program with the highest fitness
    pub fn best_program(&self) -> Option<&Program> {
        self.programs
            .iter()
            .filter(|p| p.evaluated)
            .max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(Ordering::Equal))
    }

    /// Draw `num` distinct programs by roulette wheel, without
    /// replacement. None when fewer than `num` programs are evaluated.
    fn select(&mut self, num: usize) -> Option<Vec<usize>> {
        let mut buckets: Vec<usize> =
            (0..self.programs.len()).filter(|&i| self.programs[i].evaluated).collect();
        if buckets.len() < num {
            return None;
        }

        let mut weights: Vec<f64> = match self.params.selection {
            Selection::RouletteLinear => {
                buckets.iter().map(|&i| self.programs[i].fitness.max(0.0)).collect()
            }
            Selection::RouletteRanked => {
                buckets.sort_by(|&a, &b| {
                    self.programs[a]
                        .fitness
                        .partial_cmp(&self.programs[b].fitness)
                        .unwrap_or(Ordering::Equal)
                });
                // rank 1..n stands in for the raw fitness
                (1..=buckets.len()).map(|rank| rank as f64).collect()
            }
        };

        let mut chosen = Vec::with_capacity(num);
        for _ in 0..num {
            let total: f64 = weights.iter().sum();
            let pick = if total > 0.0 {
                let mut x = self.rng.gen::<f64>() * total;
                let mut found = weights.len() - 1;
                for (i, &w) in weights.iter().enumerate() {
                    if x < w {
                        found = i;
                        break;
                    }
                    x -= w;
                }
                found
            } else {
                // all weights zero: fall back to a uniform draw
                self.rng.gen_range(0..weights.len())
            };
            chosen.push(buckets.remove(pick));
            weights.remove(pick);
        }
        Some(chosen)
    }

    fn crossover(&mut self, first: usize, second: usize) {
        if first == second {
            return;
        }
        let (a, b) = split_pair(&mut self.programs, first, second);
        match self.callbacks.crossover.as_mut() {
            Some(custom) => custom(&mut self.rng, a, b),
            None => one_point_crossover(&mut self.rng, a, b),
        }
    }

    fn mutate(&mut self, index: usize) {
        let program = &mut self.programs[index];
        match self.callbacks.mutate.as_mut() {
            Some(custom) => custom(&mut self.rng, program),
            None => point_mutate(&mut self.rng, program),
        }
    }
}

/// Default crossover: extract a random point from each program, replace
/// each other's point with the adopted subtree
pub fn one_point_crossover(rng: &mut StdRng, a: &mut Program, b: &mut Program) {
    let mut interp_a = a.interp.lock().unwrap();
    let mut interp_b = b.interp.lock().unwrap();

    let point_a = rng.gen_range(0..code::size(&interp_a.heap, a.code));
    let point_b = rng.gen_range(0..code::size(&interp_b.heap, b.code));

    let sub_a = code::extract(&interp_a.heap, a.code, point_a);
    let sub_b = code::extract(&interp_b.heap, b.code, point_b);

    let sub_b_adopted = interp_a.adopt_value(&interp_b, sub_b);
    let sub_a_adopted = interp_b.adopt_value(&interp_a, sub_a);

    let new_a = code::replace(&mut interp_a.heap, a.code, point_a, sub_b_adopted);
    let new_b = code::replace(&mut interp_b.heap, b.code, point_b, sub_a_adopted);

    interp_a.heap.unpin(a.code);
    interp_a.heap.pin(new_a);
    a.code = new_a;

    interp_b.heap.unpin(b.code);
    interp_b.heap.pin(new_b);
    b.code = new_b;
}

/// Default mutation: replace a random point with a fresh random value
/// whose size budget matches the replaced subtree, keeping tree size
/// roughly stationary
pub fn point_mutate(rng: &mut StdRng, program: &mut Program) {
    let mut interp = program.interp.lock().unwrap();

    let point = rng.gen_range(0..code::size(&interp.heap, program.code));
    let replaced = code::extract(&interp.heap, program.code, point);
    let mut budget = code::size(&interp.heap, replaced);
    let fresh = random_value(&mut interp, None, &mut budget, false);

    let mutated = code::replace(&mut interp.heap, program.code, point, fresh);
    interp.heap.unpin(program.code);
    interp.heap.pin(mutated);
    program.code = mutated;
}

fn split_pair(programs: &mut [Program], first: usize, second: usize) -> (&mut Program, &mut Program) {
    if first < second {
        let (left, right) = programs.split_at_mut(second);
        (&mut left[first], &mut right[0])
    } else {
        let (left, right) = programs.split_at_mut(first);
        (&mut right[0], &mut left[second])
    }
}
