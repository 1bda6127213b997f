// Copyright 2025 the cavern authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The classic first sample: a triangle four units tall, five up and five
//! forward of the tracking origin, here spinning slowly about its own
//! axis.
//!
//! Pushing the wand joystick glides the viewer along the wand's facing;
//! deflecting it sideways turns. Escape or closing the mirror window
//! quits. Run with `RUST_LOG=info` for the startup and shutdown
//! milestones.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glow::HasContext;

use cavern_sdk::prelude::*;

/// Top navigation speed in scene units per second at full deflection.
const NAV_SPEED: f32 = 5.0;
/// Joystick deflection below this reads as centered.
const DEAD_ZONE: f32 = 0.2;
/// Seconds per full revolution of the triangle.
const SPIN_PERIOD: f32 = 12.0;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: [-2.0, 0.0, 0.0],
        color: [1.0, 0.35, 0.2],
    },
    Vertex {
        position: [2.0, 0.0, 0.0],
        color: [0.2, 1.0, 0.35],
    },
    Vertex {
        position: [0.0, 4.0, 0.0],
        color: [0.25, 0.4, 1.0],
    },
];

const VERTEX_SHADER: &str = r#"#version 330 core
layout (location = 0) in vec3 a_position;
layout (location = 1) in vec3 a_color;
uniform mat4 u_mvp;
out vec3 v_color;
void main() {
    v_color = a_color;
    gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330 core
in vec3 v_color;
out vec4 frag_color;
void main() {
    frag_color = vec4(v_color, 1.0);
}
"#;

/// GL handles built by the init callback and consumed by the draw
/// callback. Both closures run on the render thread; this slot is how
/// they share.
struct Scene {
    program: glow::Program,
    vao: glow::VertexArray,
    mvp_location: glow::UniformLocation,
}

fn build_scene(gl: &glow::Context) -> Scene {
    unsafe {
        let program = gl.create_program().expect("create program");
        for (stage, source) in [
            (glow::VERTEX_SHADER, VERTEX_SHADER),
            (glow::FRAGMENT_SHADER, FRAGMENT_SHADER),
        ] {
            let shader = gl.create_shader(stage).expect("create shader");
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                panic!("shader compile failed: {}", gl.get_shader_info_log(shader));
            }
            gl.attach_shader(program, shader);
            gl.delete_shader(shader);
        }
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            panic!("program link failed: {}", gl.get_program_info_log(program));
        }
        let mvp_location = gl
            .get_uniform_location(program, "u_mvp")
            .expect("u_mvp uniform");

        let vao = gl.create_vertex_array().expect("create vertex array");
        let vbo = gl.create_buffer().expect("create buffer");
        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&TRIANGLE),
            glow::STATIC_DRAW,
        );
        let stride = std::mem::size_of::<Vertex>() as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 12);
        gl.bind_vertex_array(None);

        Scene {
            program,
            vao,
            mvp_location,
        }
    }
}

/// The per-eye draw. The target is already bound, sized and cleared; the
/// callback only issues geometry.
fn draw_scene(gl: &glow::Context, scene: &Scene, args: &RenderArgs) {
    let spin = Mat4::from_rotation_y(args.time * std::f32::consts::TAU / SPIN_PERIOD);
    let model = Mat4::from_translation(Vec3::new(0.0, 5.0, -5.0)) * spin;
    let mvp = args.projection * args.view * args.nav * model;
    let cols = mvp.to_cols_array_2d();

    unsafe {
        gl.use_program(Some(scene.program));
        gl.uniform_matrix_4_f32_slice(
            Some(&scene.mvp_location),
            false,
            bytemuck::cast_slice(&cols),
        );
        gl.bind_vertex_array(Some(scene.vao));
        gl.draw_arrays(glow::TRIANGLES, 0, 3);
        gl.bind_vertex_array(None);
        gl.use_program(None);
    }
}

/// Joystick flying: push to glide along the wand's facing, deflect
/// sideways to turn about the vertical.
fn navigate(cave: &CaveSystem, prev_time: &mut f32) {
    let (jx, jy) = cave.joystick();
    let t = cave.get_time();
    let dt = t - *prev_time;
    *prev_time = t;

    if jy.abs() > DEAD_ZONE {
        let mut wand_front = [0.0f32; 3];
        cave.get_vector(CaveId::WandFront, &mut wand_front);
        let step = jy * NAV_SPEED * dt;
        cave.nav_translate(
            wand_front[0] * step,
            wand_front[1] * step,
            wand_front[2] * step,
        );
    }
    if jx.abs() > DEAD_ZONE {
        cave.nav_rot(-jx * 90.0 * dt, 'y');
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut cave = CaveSystem::configure(CaveConfig {
        app_name: "cavern-triangle".into(),
        window_title: "cavern triangle".into(),
        ..CaveConfig::default()
    })?;

    let scene: Arc<Mutex<Option<Scene>>> = Arc::new(Mutex::new(None));

    let init_slot = Arc::clone(&scene);
    cave.init_application(move |api| {
        *init_slot.lock().unwrap() = Some(build_scene(api.gl));
        log::info!("triangle scene ready");
    });

    let draw_slot = Arc::clone(&scene);
    cave.display(move |api, args| {
        if let Some(scene) = draw_slot.lock().unwrap().as_ref() {
            draw_scene(api.gl, scene, args);
        }
    });

    cave.stop_application(|| log::info!("triangle scene stopping"));

    cave.init()?;
    let (_, _, width, height) = cave.get_window_geometry();
    log::info!("rendering {width}x{height} per eye; Escape or window close quits");

    let mut prev_time = cave.get_time();
    while !cave.quit() {
        navigate(&cave, &mut prev_time);
        if cave.button_change(1) == 1 {
            log::info!("wand button 1 pressed at t={:.1}s", cave.get_time());
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    cave.exit();
    Ok(())
}
