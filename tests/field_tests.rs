use fluid_sim::cpu_ref::CpuExecutor;
use fluid_sim::field::{DoubleBuffer, FieldHandle, FieldKind};
use fluid_sim::PassExecutor;

#[test]
fn test_field_formats_keep_full_precision() {
    assert_eq!(FieldKind::Velocity.texture_format(), wgpu::TextureFormat::Rg32Float);
    assert_eq!(FieldKind::Pressure.texture_format(), wgpu::TextureFormat::Rg32Float);
    assert_eq!(FieldKind::Density.texture_format(), wgpu::TextureFormat::R32Float);

    assert_eq!(FieldKind::Velocity.bytes_per_cell(), 8);
    assert_eq!(FieldKind::Pressure.bytes_per_cell(), 8);
    assert_eq!(FieldKind::Density.bytes_per_cell(), 4);
}

#[test]
fn test_swap_exchanges_roles() {
    let mut exec = CpuExecutor::new();
    let a = exec.create_field(FieldKind::Velocity, 4, 4).unwrap();
    let b = exec.create_field(FieldKind::Velocity, 4, 4).unwrap();
    let (a_id, b_id) = (a.id(), b.id());

    let mut buffer = DoubleBuffer::new(a, b);
    assert_eq!(buffer.read().id(), a_id);
    assert_eq!(buffer.write().id(), b_id);

    buffer.swap();
    assert_eq!(buffer.read().id(), b_id, "swap should promote the write buffer");
    assert_eq!(buffer.write().id(), a_id);
}

#[test]
fn test_double_swap_is_identity() {
    let mut buffer = DoubleBuffer::new("first", "second");
    buffer.swap();
    buffer.swap();
    assert_eq!(buffer, DoubleBuffer::new("first", "second"));
}

#[test]
fn test_fields_get_distinct_ids() {
    let mut exec = CpuExecutor::new();
    let a = exec.create_field(FieldKind::Density, 8, 8).unwrap();
    let b = exec.create_field(FieldKind::Density, 8, 8).unwrap();
    assert_ne!(a.id(), b.id());
    assert_eq!(exec.live_fields(), 2);

    exec.release_field(a);
    assert_eq!(exec.live_fields(), 1);
}

#[test]
fn test_zero_sized_field_is_rejected() {
    let mut exec = CpuExecutor::new();
    assert!(exec.create_field(FieldKind::Velocity, 0, 16).is_err());
    assert!(exec.create_field(FieldKind::Velocity, 16, 0).is_err());
}
