//! Unit tests for pipeline fixed-function state (no GPU required)

use super::*;

// ============================================================================
// VERTEX INPUT TESTS
// ============================================================================

#[test]
fn test_vertex_binding_stride_matches_vertex() {
    let binding = vertex_binding();
    assert_eq!(binding.binding, 0);
    assert_eq!(binding.stride, 32);
    assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
}

#[test]
fn test_vertex_attributes_locations_and_offsets() {
    let attributes = vertex_attributes();

    let locations: Vec<u32> = attributes.iter().map(|a| a.location).collect();
    let offsets: Vec<u32> = attributes.iter().map(|a| a.offset).collect();
    assert_eq!(locations, vec![0, 1, 2]);
    assert_eq!(offsets, vec![0, 12, 24]);

    assert_eq!(attributes[0].format, vk::Format::R32G32B32_SFLOAT);
    assert_eq!(attributes[1].format, vk::Format::R32G32B32_SFLOAT);
    assert_eq!(attributes[2].format, vk::Format::R32G32_SFLOAT);
}

// ============================================================================
// VIEWPORT / DEPTH TESTS
// ============================================================================

#[test]
fn test_full_viewport_covers_extent() {
    let (viewport, scissor) = full_viewport(Extent2D::new(800, 600));

    assert_eq!(viewport.width, 800.0);
    assert_eq!(viewport.height, 600.0);
    assert_eq!(viewport.min_depth, 0.0);
    assert_eq!(viewport.max_depth, 1.0);
    assert_eq!(scissor.extent.width, 800);
    assert_eq!(scissor.extent.height, 600);
    assert_eq!(scissor.offset.x, 0);
}

#[test]
fn test_depth_state_with_depth_test() {
    let state = depth_stencil_state(true);
    assert_eq!(state.depth_test_enable, vk::TRUE);
    assert_eq!(state.depth_write_enable, vk::TRUE);
    assert_eq!(state.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(state.stencil_test_enable, vk::FALSE);
}

#[test]
fn test_depth_state_without_depth_test() {
    let state = depth_stencil_state(false);
    assert_eq!(state.depth_test_enable, vk::FALSE);
    assert_eq!(state.depth_write_enable, vk::FALSE);
}
