//! The authoritative physics world for one level.
//!
//! Every body is built from thin segment shapes, the way players draw them: a
//! closed loop for custom outlines and boxes, two opposite segments for lines
//! and the ground. Shapes are cuboids of half-thickness [`LINE_RADIUS`].
//!
//! Mass and moment are set explicitly per body; shapes carry no density.

use crate::level::{
    CollisionTag, GroundSegment, LevelBody, LevelDescription, LevelError, LevelLibrary,
    LevelShape,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rapier2d::prelude::*;
use shared::{BodyPose, CodecError, Color, Message, NewBody, Vertex, Zone};
use thiserror::Error;

/// Fixed simulation step.
pub const TIMESTEP: f32 = 1.0 / 60.0;
/// Downward gravity.
pub const GRAVITY_Y: f32 = -75.0;
/// Half-thickness of every segment shape.
pub const LINE_RADIUS: f32 = 0.5;
/// Friction of player-drawn bodies.
pub const PLAYER_FRICTION: f32 = 1.0;
/// Id of the static ground body.
pub const GROUND_ID: u32 = 0;

/// Reasons a body cannot be created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorldError {
    #[error("outline with {vertices} vertices does not enclose an area")]
    DegeneratePolygon { vertices: usize },
    #[error("invalid body mass {0}")]
    InvalidMass(f32),
    /// The body's NewBody announcement would not fit in one frame.
    #[error("body cannot be announced: {0}")]
    Unannounceable(CodecError),
}

/// Progress of the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldStatus {
    Playing,
    Won,
    /// Attempts are exhausted; a level switch is due.
    LostPending,
}

/// Whether the last step produced the win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub newly_won: bool,
}

/// Kind of engine object released by teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    Shape,
    Constraint,
    Body,
}

/// What [`World::teardown`] released, in release order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TeardownReport {
    pub order: Vec<Released>,
}

impl TeardownReport {
    pub fn count(&self, kind: Released) -> usize {
        self.order.iter().filter(|&&released| released == kind).count()
    }
}

#[derive(Debug, Clone)]
struct BodyRecord {
    id: u32,
    color: Color,
    mass: f32,
    outline: Vec<Vertex>,
    handle: RigidBodyHandle,
}

/// Collects collision starts during a step.
#[derive(Default)]
struct ContactCollector {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(h1, h2, _flags) = event {
            self.started.lock().push((h1, h2));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

/// Rigid bodies of one level plus the ground, zone and win state.
pub struct World {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    contacts: ContactCollector,

    bodies: Vec<BodyRecord>,
    zone: Option<Zone>,
    status: WorldStatus,
    timestep: u64,
    body_count: u32,
    torn_down: bool,
}

impl World {
    /// An empty world holding only the ground body.
    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: TIMESTEP,
            ..Default::default()
        };

        let mut world = Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, GRAVITY_Y),
            contacts: ContactCollector::default(),
            bodies: Vec::new(),
            zone: None,
            status: WorldStatus::Playing,
            timestep: 0,
            body_count: 0,
            torn_down: false,
        };

        let ground = RigidBodyBuilder::fixed()
            .user_data(u128::from(GROUND_ID))
            .build();
        let handle = world.rigid_body_set.insert(ground);
        let id = world.next_id();
        world.bodies.push(BodyRecord {
            id,
            color: Color::default(),
            mass: 0.0,
            outline: Vec::new(),
            handle,
        });
        world
    }

    /// Loads level `level` from `library`.
    pub fn load(library: &LevelLibrary, level: u32) -> Result<Self, LevelError> {
        let description = library.load(level)?;
        let world = Self::from_description(&description);
        info!(
            "Loaded level {} with {} bodies",
            level,
            world.bodies.len()
        );
        Ok(world)
    }

    /// Builds a world from a parsed level. Bodies the engine cannot build are
    /// skipped with a warning.
    pub fn from_description(description: &LevelDescription) -> Self {
        let mut world = Self::new();

        for segment in &description.ground {
            world.add_ground_segment(segment);
        }
        for body in &description.bodies {
            if let Err(e) = world.add_level_body(body) {
                warn!("Skipping level body {:?}: {}", body.shape, e);
            }
        }
        world.zone = description.zone;
        world
    }

    /// Creates a dynamic body from an outline given in world coordinates.
    /// The outline is re-centered on its vertex mean, which becomes the body
    /// position. Outlines whose announcement would not fit in one frame are
    /// refused. Returns the new body id.
    pub fn create_body(
        &mut self,
        vertices: &[Vertex],
        color: Color,
        tag: CollisionTag,
        friction: f32,
        mass: f32,
    ) -> Result<u32, WorldError> {
        validate_mass(mass)?;
        if vertices.len() < 2 {
            return Err(WorldError::DegeneratePolygon {
                vertices: vertices.len(),
            });
        }

        let n = vertices.len() as f32;
        let center = Vertex::new(
            vertices.iter().map(|v| v.x).sum::<f32>() / n,
            vertices.iter().map(|v| v.y).sum::<f32>() / n,
        );
        let outline: Vec<Vertex> = vertices
            .iter()
            .map(|v| Vertex::new(v.x - center.x, v.y - center.y))
            .collect();

        let radius = outline.iter().map(|v| v.x.hypot(v.y)).sum::<f32>() / n;
        if !(radius.is_finite() && radius > f32::EPSILON) {
            return Err(WorldError::DegeneratePolygon {
                vertices: vertices.len(),
            });
        }

        Message::NewBody(NewBody {
            body_id: self.body_count as i32,
            color,
            mass,
            vertices: outline.clone(),
        })
        .encode()
        .map_err(WorldError::Unannounceable)?;

        let segments = closed_loop(&outline);
        Ok(self.insert_dynamic(center, outline, segments, color, tag, friction, mass, radius))
    }

    fn add_ground_segment(&mut self, segment: &GroundSegment) {
        let handle = self.bodies[0].handle;
        for (a, b) in [(segment.from, segment.to), (segment.to, segment.from)] {
            if let Some(collider) =
                segment_collider(a, b, CollisionTag::Obstacle, segment.friction)
            {
                self.collider_set
                    .insert_with_parent(collider, handle, &mut self.rigid_body_set);
            }
        }

        let ground = &mut self.bodies[0];
        ground.color = segment.color;
        ground.outline.extend([segment.from, segment.to]);
    }

    fn add_level_body(&mut self, body: &LevelBody) -> Result<u32, WorldError> {
        match &body.shape {
            LevelShape::Custom { vertices } => {
                self.create_body(vertices, body.color, body.tag, body.friction, body.mass)
            }
            LevelShape::Box {
                x,
                y,
                width,
                height,
            } => {
                validate_mass(body.mass)?;
                let (hw, hh) = (width / 2.0, height / 2.0);
                let corners = vec![
                    Vertex::new(-hw, -hh),
                    Vertex::new(-hw, hh),
                    Vertex::new(hw, hh),
                    Vertex::new(hw, -hh),
                ];
                let moment = body.mass * (width * width + height * height) / 12.0;
                let radius = gyration_radius(body.mass, moment).ok_or(
                    WorldError::DegeneratePolygon { vertices: 4 },
                )?;
                let segments = closed_loop(&corners);
                Ok(self.insert_dynamic(
                    Vertex::new(*x, *y),
                    corners,
                    segments,
                    body.color,
                    body.tag,
                    body.friction,
                    body.mass,
                    radius,
                ))
            }
            LevelShape::Line { from, to } => {
                validate_mass(body.mass)?;
                let center = Vertex::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
                let a = Vertex::new(from.x - center.x, from.y - center.y);
                let b = Vertex::new(to.x - center.x, to.y - center.y);
                let length = (to.x - from.x).hypot(to.y - from.y);
                let moment = body.mass * length * length / 12.0;
                let radius = gyration_radius(body.mass, moment)
                    .ok_or(WorldError::DegeneratePolygon { vertices: 2 })?;
                Ok(self.insert_dynamic(
                    center,
                    vec![a, b],
                    vec![(a, b), (b, a)],
                    body.color,
                    body.tag,
                    body.friction,
                    body.mass,
                    radius,
                ))
            }
        }
    }

    /// Inserts a dynamic body whose moment equals that of a disc of `radius`.
    #[allow(clippy::too_many_arguments)]
    fn insert_dynamic(
        &mut self,
        position: Vertex,
        outline: Vec<Vertex>,
        segments: Vec<(Vertex, Vertex)>,
        color: Color,
        tag: CollisionTag,
        friction: f32,
        mass: f32,
        radius: f32,
    ) -> u32 {
        let id = self.next_id();
        let density = mass / (std::f32::consts::PI * radius * radius);

        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y))
            .additional_mass_properties(MassProperties::from_ball(density, radius))
            .user_data(u128::from(id))
            .build();
        let handle = self.rigid_body_set.insert(rigid_body);

        for (a, b) in segments {
            if let Some(collider) = segment_collider(a, b, tag, friction) {
                self.collider_set
                    .insert_with_parent(collider, handle, &mut self.rigid_body_set);
            }
        }

        debug!("Created body {} ({:?}, {}, mass {})", id, tag, color, mass);
        self.bodies.push(BodyRecord {
            id,
            color,
            mass,
            outline,
            handle,
        });
        id
    }

    fn next_id(&mut self) -> u32 {
        let id = self.body_count;
        self.body_count += 1;
        id
    }

    /// Advances the simulation by one [`TIMESTEP`].
    pub fn step(&mut self) -> StepOutcome {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &self.contacts,
        );
        self.timestep += 1;

        let started = std::mem::take(&mut *self.contacts.started.lock());
        let target_hit = started.into_iter().any(|(h1, h2)| {
            matches!(
                (self.collider_tag(h1), self.collider_tag(h2)),
                (Some(CollisionTag::Target), Some(CollisionTag::Player))
                    | (Some(CollisionTag::Player), Some(CollisionTag::Target))
            )
        });

        if target_hit && self.status != WorldStatus::Won {
            info!("Target reached at step {}", self.timestep);
            self.status = WorldStatus::Won;
            return StepOutcome { newly_won: true };
        }
        StepOutcome::default()
    }

    fn collider_tag(&self, handle: ColliderHandle) -> Option<CollisionTag> {
        self.collider_set
            .get(handle)
            .and_then(|collider| CollisionTag::from_user_data(collider.user_data))
    }

    pub fn status(&self) -> WorldStatus {
        self.status
    }

    /// Flags the world as lost. A won world stays won.
    pub fn mark_lost(&mut self) {
        if self.status != WorldStatus::Won {
            self.status = WorldStatus::LostPending;
        }
    }

    /// Steps taken since the world was built.
    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Id the next created body will get.
    pub fn body_count(&self) -> u32 {
        self.body_count
    }

    pub fn zone(&self) -> Option<Zone> {
        self.zone
    }

    /// Current pose of every body, ground included, in id order.
    pub fn poses(&self) -> Vec<BodyPose> {
        self.bodies
            .iter()
            .filter_map(|record| {
                let body = self.rigid_body_set.get(record.handle)?;
                let translation = body.translation();
                Some(BodyPose {
                    body_id: record.id,
                    angle: body.rotation().angle(),
                    x: translation.x,
                    y: translation.y,
                })
            })
            .collect()
    }

    /// Announcement for one body, with its outline in body coordinates.
    pub fn body_message(&self, id: u32) -> Option<NewBody> {
        self.bodies
            .iter()
            .find(|record| record.id == id)
            .map(record_message)
    }

    /// Announcements for every body: the ground first, then by id.
    pub fn snapshot_bodies(&self) -> Vec<NewBody> {
        self.bodies.iter().map(record_message).collect()
    }

    /// Releases every shape, then every constraint, then every body.
    /// Running it again releases nothing.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.torn_down {
            return report;
        }

        let colliders: Vec<ColliderHandle> =
            self.collider_set.iter().map(|(handle, _)| handle).collect();
        for handle in colliders {
            if self
                .collider_set
                .remove(handle, &mut self.island_manager, &mut self.rigid_body_set, false)
                .is_some()
            {
                report.order.push(Released::Shape);
            }
        }

        let joints: Vec<ImpulseJointHandle> = self
            .impulse_joint_set
            .iter()
            .map(|(handle, _)| handle)
            .collect();
        for handle in joints {
            if self.impulse_joint_set.remove(handle, false).is_some() {
                report.order.push(Released::Constraint);
            }
        }

        let bodies: Vec<RigidBodyHandle> =
            self.rigid_body_set.iter().map(|(handle, _)| handle).collect();
        for handle in &bodies {
            self.multibody_joint_set
                .remove_joints_attached_to_rigid_body(*handle);
        }
        for handle in bodies {
            if self
                .rigid_body_set
                .remove(
                    handle,
                    &mut self.island_manager,
                    &mut self.collider_set,
                    &mut self.impulse_joint_set,
                    &mut self.multibody_joint_set,
                    false,
                )
                .is_some()
            {
                report.order.push(Released::Body);
            }
        }

        self.bodies.clear();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
        self.island_manager = IslandManager::new();
        self.ccd_solver = CCDSolver::new();
        self.physics_pipeline = PhysicsPipeline::new();
        self.torn_down = true;

        debug!(
            "World torn down: {} shapes, {} constraints, {} bodies",
            report.count(Released::Shape),
            report.count(Released::Constraint),
            report.count(Released::Body)
        );
        report
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn record_message(record: &BodyRecord) -> NewBody {
    NewBody {
        body_id: record.id as i32,
        color: record.color,
        mass: record.mass,
        vertices: record.outline.clone(),
    }
}

fn validate_mass(mass: f32) -> Result<(), WorldError> {
    if mass.is_finite() && mass > 0.0 {
        Ok(())
    } else {
        Err(WorldError::InvalidMass(mass))
    }
}

/// Radius of the disc with the given mass and moment.
fn gyration_radius(mass: f32, moment: f32) -> Option<f32> {
    let radius = (2.0 * moment / mass).sqrt();
    (radius.is_finite() && radius > f32::EPSILON).then_some(radius)
}

/// `v[n-1] -> v[0]`, then `v[i] -> v[i+1]`.
fn closed_loop(vertices: &[Vertex]) -> Vec<(Vertex, Vertex)> {
    let Some(&last) = vertices.last() else {
        return Vec::new();
    };
    std::iter::once((last, vertices[0]))
        .chain(vertices.windows(2).map(|pair| (pair[0], pair[1])))
        .collect()
}

/// A thin cuboid spanning `a -> b` in body coordinates. Zero-length segments
/// have no shape.
fn segment_collider(a: Vertex, b: Vertex, tag: CollisionTag, friction: f32) -> Option<Collider> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length = dx.hypot(dy);
    if length <= f32::EPSILON {
        return None;
    }

    let mut builder = ColliderBuilder::cuboid(length / 2.0, LINE_RADIUS)
        .translation(Vector::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0))
        .rotation(dy.atan2(dx))
        .friction(friction)
        .density(0.0)
        .user_data(tag.to_user_data());
    if tag != CollisionTag::Obstacle {
        builder = builder.active_events(ActiveEvents::COLLISION_EVENTS);
    }
    Some(builder.build())
}
