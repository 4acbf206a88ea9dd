//! Computational fluid dynamics solvers
//!
//! Clients of the driver seam rather than of the frame graph: each solver
//! owns its ping-pong texture pair outright and drives compute dispatches
//! directly. The velocity/density field lives in a two-slot array indexed
//! by a parity value toggled after every dispatch; a solve+blur pair flips
//! it twice, so the readable slot is always `tex[parity]`.

use crate::driver::types::{
    AddressMode, ComputeShaderHandle, CreationFlags, PostFxHandle, ScalarValue, TextureDesc,
    TextureFormat, TextureViewHandle,
};
use crate::driver::{Driver, ShaderVarId, ShaderVarRegistry};
use glam::{IVec4, UVec2, Vec2, Vec4};

/// Which quantity [`Solver::show_result`] plots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotType {
    Density = 0,
    Velocity = 1,
    Pressure = 2,
}

/// Shader variables shared by every solver, resolved once at construction.
#[derive(Debug, Clone, Copy)]
struct SolverVars {
    velocity_density_tex: ShaderVarId,
    next_velocity_density_tex: ShaderVarId,
    tex_size: ShaderVarId,
    plot_type: ShaderVarId,
    plot_tex: ShaderVarId,
    simulation_dt: ShaderVarId,
    simulation_dx: ShaderVarId,
    simulation_time: ShaderVarId,
    standard_density: ShaderVarId,
    standard_velocity: ShaderVarId,
    initial_velocity_density_tex: ShaderVarId,
    euler_implicit_mode: ShaderVarId,
}

impl SolverVars {
    fn resolve(registry: &mut ShaderVarRegistry) -> Self {
        Self {
            velocity_density_tex: registry.resolve("velocity_density_tex"),
            next_velocity_density_tex: registry.resolve("next_velocity_density_tex"),
            tex_size: registry.resolve("tex_size"),
            plot_type: registry.resolve("plot_type"),
            plot_tex: registry.resolve("plot_tex"),
            simulation_dt: registry.resolve("simulation_dt"),
            simulation_dx: registry.resolve("simulation_dx"),
            simulation_time: registry.resolve("simulation_time"),
            standard_density: registry.resolve("standard_density"),
            standard_velocity: registry.resolve("standard_velocity"),
            initial_velocity_density_tex: registry.resolve("initial_velocity_density_tex"),
            euler_implicit_mode: registry.resolve("euler_implicit_mode"),
        }
    }
}

fn field_texture(driver: &mut impl Driver, label: &str, size: UVec2) -> TextureViewHandle {
    driver.create_texture(&TextureDesc {
        label: label.to_string(),
        size,
        format: TextureFormat::Rgba32Float,
        flags: CreationFlags::UNORDERED_ACCESS,
        // Mirror for ghost cells on the edges.
        address_mode: AddressMode::MirrorRepeat,
    })
}

/// Single-grid fluid solver
pub struct Solver {
    vars: SolverVars,
    initial_conditions_cs: ComputeShaderHandle,
    solver_cs: ComputeShaderHandle,
    blur_cs: ComputeShaderHandle,
    show_solution: PostFxHandle,
    tex: [TextureViewHandle; 2],
    parity: usize,
    tex_size: UVec2,
    simulation_time: f32,
    total_dispatches: u32,
}

impl Solver {
    pub fn new(
        driver: &mut impl Driver,
        registry: &mut ShaderVarRegistry,
        solver_shader_name: &str,
        tex_size: UVec2,
        spatial_step: f32,
    ) -> Self {
        let vars = SolverVars::resolve(registry);

        let solver = Self {
            vars,
            initial_conditions_cs: driver.load_compute_shader("fill_initial_conditions"),
            solver_cs: driver.load_compute_shader(solver_shader_name),
            blur_cs: driver.load_compute_shader("blur_result_cs"),
            show_solution: driver.load_postfx("show_cfd_solution"),
            tex: [
                field_texture(driver, "velocity_density_tex", tex_size),
                field_texture(driver, "next_velocity_density_tex", tex_size),
            ],
            parity: 0,
            tex_size,
            simulation_time: 0.0,
            total_dispatches: 0,
        };

        driver.set_scalar(
            vars.tex_size,
            ScalarValue::Int4(IVec4::new(tex_size.x as i32, tex_size.y as i32, 0, 0)),
        );
        driver.set_scalar(vars.simulation_dx, ScalarValue::Float(spatial_step));

        solver
    }

    pub fn fill_initial_conditions(
        &mut self,
        driver: &mut impl Driver,
        standard_density: f32,
        standard_velocity: Vec2,
    ) {
        driver.set_texture(self.vars.velocity_density_tex, self.tex[self.parity]);
        driver.set_scalar(self.vars.standard_density, ScalarValue::Float(standard_density));
        driver.set_scalar(
            self.vars.standard_velocity,
            ScalarValue::Color(Vec4::new(standard_velocity.x, standard_velocity.y, 0.0, 0.0)),
        );
        driver.dispatch_threads(self.initial_conditions_cs, self.tex_size.x, self.tex_size.y, 1);
    }

    /// Advance the simulation by `num_dispatches` solve+blur pairs.
    pub fn solve_equations(&mut self, driver: &mut impl Driver, dt: f32, num_dispatches: u32) {
        let mut implicit = 0;
        for _ in 0..num_dispatches {
            driver.set_texture(self.vars.velocity_density_tex, self.tex[self.parity]);
            driver.set_texture(self.vars.next_velocity_density_tex, self.tex[1 - self.parity]);
            driver.set_scalar(self.vars.simulation_dt, ScalarValue::Float(dt));
            driver.set_scalar(self.vars.simulation_time, ScalarValue::Float(self.simulation_time));
            driver.set_scalar(self.vars.euler_implicit_mode, ScalarValue::Int(implicit));

            driver.dispatch_threads(self.solver_cs, self.tex_size.x, self.tex_size.y, 1);

            self.simulation_time += dt;
            self.parity = 1 - self.parity;
            implicit = 1 - implicit;

            driver.set_texture(self.vars.velocity_density_tex, self.tex[self.parity]);
            driver.set_texture(self.vars.next_velocity_density_tex, self.tex[1 - self.parity]);

            driver.dispatch_threads(self.blur_cs, self.tex_size.x, self.tex_size.y, 1);

            self.parity = 1 - self.parity;
        }

        self.total_dispatches += num_dispatches;
    }

    pub fn show_result(&self, driver: &mut impl Driver, plot_type: PlotType) {
        driver.set_scalar(self.vars.plot_type, ScalarValue::Int(plot_type as i32));
        driver.set_texture(self.vars.plot_tex, self.tex[self.parity]);
        driver.render_postfx(self.show_solution);
    }

    /// The slot holding the latest completed step.
    pub fn result_texture(&self) -> TextureViewHandle {
        self.tex[self.parity]
    }

    pub fn simulation_time(&self) -> f32 {
        self.simulation_time
    }

    pub fn num_dispatches(&self) -> u32 {
        self.total_dispatches
    }
}

/// Whether a cascade solver still has work left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    Solving,
    /// Every cascade has consumed its dispatch budget; further
    /// `solve_equations` calls issue no work.
    Completed,
}

struct Cascade {
    tex_size: UVec2,
    spatial_step: f32,
    dt_multiplier: f32,
    tex: [TextureViewHandle; 2],
    parity: usize,
}

/// Multi-resolution fluid solver.
///
/// Runs the simulation on [`CascadeSolver::NUM_CASCADES`] grids of doubling
/// resolution. Each cascade has a dispatch budget; once a budget is spent
/// the next cascade is seeded from the current result and takes over.
/// After the finest cascade's budget the solver reports
/// [`SolveState::Completed`] and drops any further requested dispatches.
pub struct CascadeSolver {
    vars: SolverVars,
    initial_conditions_cs: ComputeShaderHandle,
    initial_conditions_from_tex_cs: ComputeShaderHandle,
    solver_cs: ComputeShaderHandle,
    blur_cs: ComputeShaderHandle,
    show_solution: PostFxHandle,
    cascades: Vec<Cascade>,
    dispatches_per_cascade: [u32; Self::NUM_CASCADES],
    current_cascade: usize,
    current_dispatches: u32,
    total_dispatches: u32,
    simulation_time: f32,
    completed: bool,
}

impl CascadeSolver {
    pub const NUM_CASCADES: usize = 4;

    /// Coarser cascades can take larger steps.
    pub const DT_MULTIPLIERS: [f32; Self::NUM_CASCADES] = [2.0, 2.0, 1.5, 1.0];

    pub fn new(
        driver: &mut impl Driver,
        registry: &mut ShaderVarRegistry,
        solver_shader_name: &str,
        tex_size: UVec2,
        dispatches_per_cascade: [u32; Self::NUM_CASCADES],
        spatial_step: f32,
    ) -> Self {
        let vars = SolverVars::resolve(registry);

        let cascades = (0..Self::NUM_CASCADES)
            .map(|i| {
                let shift = (Self::NUM_CASCADES - 1 - i) as u32;
                let size = UVec2::new(tex_size.x >> shift, tex_size.y >> shift);
                Cascade {
                    tex_size: size,
                    spatial_step: spatial_step * (1 << shift) as f32,
                    dt_multiplier: Self::DT_MULTIPLIERS[i],
                    tex: [
                        field_texture(driver, &format!("velocity_pressure_cascade_{i}"), size),
                        field_texture(driver, &format!("next_velocity_pressure_cascade_{i}"), size),
                    ],
                    parity: 0,
                }
            })
            .collect();

        Self {
            vars,
            initial_conditions_cs: driver.load_compute_shader("fill_initial_conditions"),
            initial_conditions_from_tex_cs: driver
                .load_compute_shader("fill_initial_conditions_from_tex"),
            solver_cs: driver.load_compute_shader(solver_shader_name),
            blur_cs: driver.load_compute_shader("blur_result_cs"),
            show_solution: driver.load_postfx("show_cfd_solution"),
            cascades,
            dispatches_per_cascade,
            current_cascade: 0,
            current_dispatches: 0,
            total_dispatches: 0,
            simulation_time: 0.0,
            completed: false,
        }
    }

    /// (Re)start the simulation on the coarsest cascade.
    pub fn fill_initial_conditions(
        &mut self,
        driver: &mut impl Driver,
        standard_density: f32,
        standard_velocity: Vec2,
    ) {
        self.current_cascade = 0;
        self.current_dispatches = 0;
        self.completed = false;
        self.bind_cascade(driver, 0);

        driver.set_scalar(self.vars.standard_density, ScalarValue::Float(standard_density));
        driver.set_scalar(
            self.vars.standard_velocity,
            ScalarValue::Color(Vec4::new(standard_velocity.x, standard_velocity.y, 0.0, 0.0)),
        );
        let size = self.cascades[0].tex_size;
        driver.dispatch_threads(self.initial_conditions_cs, size.x, size.y, 1);
    }

    /// Advance by up to `num_dispatches` solve+blur pairs on the current
    /// cascade, moving on to the next cascade when its budget is spent.
    pub fn solve_equations(
        &mut self,
        driver: &mut impl Driver,
        dt: f32,
        num_dispatches: u32,
    ) -> SolveState {
        if self.completed {
            return SolveState::Completed;
        }

        let cascade = &mut self.cascades[self.current_cascade];
        let actual_dt = dt * cascade.dt_multiplier;
        driver.set_scalar(self.vars.simulation_dt, ScalarValue::Float(actual_dt));

        for _ in 0..num_dispatches {
            driver.set_texture(self.vars.velocity_density_tex, cascade.tex[cascade.parity]);
            driver.set_texture(
                self.vars.next_velocity_density_tex,
                cascade.tex[1 - cascade.parity],
            );

            driver.dispatch_threads(self.solver_cs, cascade.tex_size.x, cascade.tex_size.y, 1);

            self.simulation_time += actual_dt;
            cascade.parity = 1 - cascade.parity;

            driver.set_texture(self.vars.velocity_density_tex, cascade.tex[cascade.parity]);
            driver.set_texture(
                self.vars.next_velocity_density_tex,
                cascade.tex[1 - cascade.parity],
            );

            driver.dispatch_threads(self.blur_cs, cascade.tex_size.x, cascade.tex_size.y, 1);

            cascade.parity = 1 - cascade.parity;
        }

        self.current_dispatches += num_dispatches;
        self.total_dispatches += num_dispatches;

        if self.current_dispatches >= self.dispatches_per_cascade[self.current_cascade] {
            if self.current_cascade == Self::NUM_CASCADES - 1 {
                log::debug!(
                    "cascade solver completed after {} dispatches",
                    self.total_dispatches
                );
                self.completed = true;
                return SolveState::Completed;
            }
            self.advance_cascade(driver);
        }

        SolveState::Solving
    }

    pub fn show_result(&self, driver: &mut impl Driver, plot_type: PlotType) {
        let cascade = &self.cascades[self.current_cascade];
        driver.set_scalar(self.vars.plot_type, ScalarValue::Int(plot_type as i32));
        driver.set_texture(self.vars.plot_tex, cascade.tex[cascade.parity]);
        driver.render_postfx(self.show_solution);
    }

    pub fn state(&self) -> SolveState {
        if self.completed {
            SolveState::Completed
        } else {
            SolveState::Solving
        }
    }

    pub fn current_cascade(&self) -> usize {
        self.current_cascade
    }

    pub fn result_texture(&self) -> TextureViewHandle {
        let cascade = &self.cascades[self.current_cascade];
        cascade.tex[cascade.parity]
    }

    pub fn simulation_time(&self) -> f32 {
        self.simulation_time
    }

    pub fn num_dispatches(&self) -> u32 {
        self.total_dispatches
    }

    /// Seed the next cascade from the current result, then switch to it.
    fn advance_cascade(&mut self, driver: &mut impl Driver) {
        let current = &self.cascades[self.current_cascade];
        driver.set_texture(
            self.vars.initial_velocity_density_tex,
            current.tex[current.parity],
        );
        let next = self.current_cascade + 1;
        let next_size = self.cascades[next].tex_size;
        driver.dispatch_threads(self.initial_conditions_from_tex_cs, next_size.x, next_size.y, 1);

        self.current_cascade = next;
        self.current_dispatches = 0;
        self.bind_cascade(driver, next);
    }

    /// Point the shared shader variables at one cascade's grid.
    fn bind_cascade(&self, driver: &mut impl Driver, index: usize) {
        let cascade = &self.cascades[index];
        driver.set_texture(self.vars.velocity_density_tex, cascade.tex[cascade.parity]);
        driver.set_texture(
            self.vars.next_velocity_density_tex,
            cascade.tex[1 - cascade.parity],
        );
        driver.set_scalar(
            self.vars.tex_size,
            ScalarValue::Int4(IVec4::new(
                cascade.tex_size.x as i32,
                cascade.tex_size.y as i32,
                0,
                0,
            )),
        );
        driver.set_scalar(self.vars.simulation_dx, ScalarValue::Float(cascade.spatial_step));
    }
}
