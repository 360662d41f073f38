//! Scene registration: the guest's entity pointer and the function pointer
//! behind each operation, plus the typed calls made against them.

use std::collections::HashMap;

use bitflags::bitflags;
use glam::Vec3;

use crate::error::{GeocError, Result};
use crate::memory::LinearMemory;

/// Built-in shapes the guest knows how to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Cube,
    Pyramid,
    Sphere,
    Cone,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [ShapeKind::Cube, ShapeKind::Pyramid, ShapeKind::Sphere, ShapeKind::Cone];

    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Cube => "Cube",
            ShapeKind::Pyramid => "Pyramid",
            ShapeKind::Sphere => "Sphere",
            ShapeKind::Cone => "Cone",
        }
    }

    pub fn export_name(self) -> &'static str {
        match self {
            ShapeKind::Cube => "insertCube",
            ShapeKind::Pyramid => "insertPyramid",
            ShapeKind::Sphere => "insertSphere",
            ShapeKind::Cone => "insertCone",
        }
    }

    pub fn registration_key(self) -> &'static str {
        match self {
            ShapeKind::Cube => "cube_fn_ptr",
            ShapeKind::Pyramid => "pyramid_fn_ptr",
            ShapeKind::Sphere => "sphere_fn_ptr",
            ShapeKind::Cone => "cone_fn_ptr",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label().eq_ignore_ascii_case(name))
    }
}

/// Every guest operation that is reached through a registered function pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetAngles,
    GetPitch,
    SetZoom,
    InsertVector,
    InsertCamera,
    InsertShape(ShapeKind),
    Clear,
    SetResolution,
    SetCamera,
    Rotate,
    Scale,
    Translate,
    Reflect,
    FreeArgs,
}

impl Operation {
    /// Order of the function pointers passed to `setSceneCallBack` after the
    /// entity pointer.
    pub const POSITIONAL: [Operation; 8] = [
        Operation::SetAngles,
        Operation::GetPitch,
        Operation::SetZoom,
        Operation::InsertVector,
        Operation::Clear,
        Operation::InsertShape(ShapeKind::Cube),
        Operation::InsertShape(ShapeKind::Pyramid),
        Operation::Rotate,
    ];

    /// Resolve a `setFnPtr` key, including the older short names.
    pub fn from_key(key: &str) -> Option<Self> {
        let op = match key {
            "set_angles_fn_ptr" | "angles_fn_ptr" => Operation::SetAngles,
            "get_pitch_fn_ptr" | "get_ax_fn_ptr" => Operation::GetPitch,
            "set_zoom_fn_ptr" | "zoom_fn_ptr" => Operation::SetZoom,
            "insert_vector_fn_ptr" | "insert_fn_ptr" => Operation::InsertVector,
            "insert_camera_fn_ptr" => Operation::InsertCamera,
            "clear_fn_ptr" => Operation::Clear,
            "set_res_fn_ptr" => Operation::SetResolution,
            "set_camera_fn_ptr" => Operation::SetCamera,
            "rotate_fn_ptr" => Operation::Rotate,
            "scale_fn_ptr" => Operation::Scale,
            "translate_fn_ptr" => Operation::Translate,
            "reflect_fn_ptr" => Operation::Reflect,
            "free_args_fn_ptr" => Operation::FreeArgs,
            other => return ShapeKind::ALL
                .into_iter()
                .find(|kind| kind.registration_key() == other)
                .map(Operation::InsertShape),
        };
        Some(op)
    }

    pub fn export_name(self) -> &'static str {
        match self {
            Operation::SetAngles => "setAngles",
            Operation::GetPitch => "getPitch",
            Operation::SetZoom => "setZoom",
            Operation::InsertVector => "insertVector",
            Operation::InsertCamera => "insertCamera",
            Operation::InsertShape(kind) => kind.export_name(),
            Operation::Clear => "clear",
            Operation::SetResolution => "setResolution",
            Operation::SetCamera => "setCamera",
            Operation::Rotate => "rotate",
            Operation::Scale => "scale",
            Operation::Translate => "translate",
            Operation::Reflect => "reflect",
            Operation::FreeArgs => "free",
        }
    }
}

bitflags! {
    /// Axes negated by a reflect call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReflectAxes: u32 {
        const X = 1;
        const Y = 2;
        const Z = 4;
    }
}

/// Location of an index array in guest memory plus the packed
/// `(vectors << 16) + shapes` count word that splits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpan {
    pub ptr: u32,
    pub len: u32,
    pub counts: u32,
}

/// A typed call into one registered guest operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCall {
    SetAngles { pitch: f32, yaw: f32 },
    GetPitch,
    SetZoom(f32),
    InsertVector(Vec3),
    InsertCamera(Vec3),
    InsertShape(ShapeKind),
    Clear,
    SetResolution(f32),
    SetCamera(i32),
    Rotate { span: IndexSpan, angles: Vec3 },
    Scale { span: IndexSpan, factor: f32 },
    Translate { span: IndexSpan, delta: Vec3 },
    Reflect { span: IndexSpan, axes: ReflectAxes },
    FreeArgs { ptr: u32, len: u32 },
}

impl EngineCall {
    pub fn operation(&self) -> Operation {
        match self {
            EngineCall::SetAngles { .. } => Operation::SetAngles,
            EngineCall::GetPitch => Operation::GetPitch,
            EngineCall::SetZoom(_) => Operation::SetZoom,
            EngineCall::InsertVector(_) => Operation::InsertVector,
            EngineCall::InsertCamera(_) => Operation::InsertCamera,
            EngineCall::InsertShape(kind) => Operation::InsertShape(*kind),
            EngineCall::Clear => Operation::Clear,
            EngineCall::SetResolution(_) => Operation::SetResolution,
            EngineCall::SetCamera(_) => Operation::SetCamera,
            EngineCall::Rotate { .. } => Operation::Rotate,
            EngineCall::Scale { .. } => Operation::Scale,
            EngineCall::Translate { .. } => Operation::Translate,
            EngineCall::Reflect { .. } => Operation::Reflect,
            EngineCall::FreeArgs { .. } => Operation::FreeArgs,
        }
    }

    /// Arguments following `(entity, fn_ptr)`.
    pub fn args(&self) -> Vec<f64> {
        fn span_args(span: &IndexSpan) -> [f64; 3] {
            [span.ptr as f64, span.len as f64, span.counts as f64]
        }
        fn vec_args(v: Vec3) -> [f64; 3] {
            [v.x as f64, v.y as f64, v.z as f64]
        }

        match self {
            EngineCall::SetAngles { pitch, yaw } => vec![*pitch as f64, *yaw as f64],
            EngineCall::GetPitch | EngineCall::Clear | EngineCall::InsertShape(_) => Vec::new(),
            EngineCall::SetZoom(delta) => vec![*delta as f64],
            EngineCall::InsertVector(v) | EngineCall::InsertCamera(v) => vec_args(*v).to_vec(),
            EngineCall::SetResolution(res) => vec![*res as f64],
            EngineCall::SetCamera(index) => vec![*index as f64],
            EngineCall::Rotate { span, angles } => [span_args(span), vec_args(*angles)].concat(),
            EngineCall::Scale { span, factor } => {
                let mut args = span_args(span).to_vec();
                args.push(*factor as f64);
                args
            }
            EngineCall::Translate { span, delta } => [span_args(span), vec_args(*delta)].concat(),
            EngineCall::Reflect { span, axes } => {
                let mut args = span_args(span).to_vec();
                args.push(axes.bits() as f64);
                args
            }
            EngineCall::FreeArgs { ptr, len } => vec![*ptr as f64, *len as f64],
        }
    }
}

/// An instantiated guest module: its linear memory and its exports.
pub trait Guest {
    type Memory: LinearMemory;

    fn memory(&mut self) -> &mut Self::Memory;

    /// Call an exported function with numeric arguments. A trap or thrown
    /// exception comes back as [`GeocError::GuestTrap`].
    fn call_export(&mut self, name: &str, args: &[f64]) -> Result<f64>;
}

/// The guest's scene entity and its registered operation pointers.
#[derive(Debug, Clone, Default)]
pub struct SceneRef {
    entity: Option<u32>,
    fn_ptrs: HashMap<Operation, u32>,
}

impl SceneRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entity(&mut self, ptr: u32) {
        self.entity = Some(ptr);
    }

    pub fn entity(&self) -> Result<u32> {
        self.entity.ok_or(GeocError::SceneNotRegistered)
    }

    pub fn is_registered(&self) -> bool {
        self.entity.is_some()
    }

    /// `setFnPtr(name, ptr)`. Returns false for keys that name no operation.
    pub fn register(&mut self, key: &str, fn_ptr: u32) -> bool {
        match Operation::from_key(key) {
            Some(op) => {
                self.fn_ptrs.insert(op, fn_ptr);
                true
            }
            None => {
                log::warn!("setFnPtr: ignoring unknown key {key:?}");
                false
            }
        }
    }

    /// `setSceneCallBack(entity, ...)` with pointers in [`Operation::POSITIONAL`] order.
    pub fn register_positional(&mut self, entity: u32, fn_ptrs: [u32; 8]) {
        self.entity = Some(entity);
        for (op, ptr) in Operation::POSITIONAL.into_iter().zip(fn_ptrs) {
            self.fn_ptrs.insert(op, ptr);
        }
    }

    pub fn fn_ptr(&self, op: Operation) -> Result<u32> {
        self.fn_ptrs
            .get(&op)
            .copied()
            .ok_or(GeocError::UnregisteredOperation(op))
    }

    pub fn invoke<G: Guest + ?Sized>(&self, guest: &mut G, call: &EngineCall) -> Result<f64> {
        let op = call.operation();
        let mut args = vec![self.entity()? as f64, self.fn_ptr(op)? as f64];
        args.extend(call.args());
        guest.call_export(op.export_name(), &args)
    }

    /// Run a guest closure registered through `setInterval`.
    pub fn apply<G: Guest + ?Sized>(&self, guest: &mut G, fn_ptr: u32, args_ptr: u32, args_len: u32) -> Result<()> {
        let args = [self.entity()? as f64, fn_ptr as f64, args_ptr as f64, args_len as f64];
        guest.call_export("apply", &args).map(|_| ())
    }
}
