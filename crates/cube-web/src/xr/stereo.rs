use fnv::FnvHashMap;
use glam::Mat4;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys as web;
use web_sys::WebGl2RenderingContext as Gl;

use cube_core::{
    Dimensions, Mesh, MeshId, Scene, Side, TextureData, Vertex, WidgetError, Wrapping,
};

use crate::dom::js_err;

/// One eye of the viewer pose, already resolved against the layer.
pub struct EyeView {
    pub viewport: [i32; 4],
    pub projection: Mat4,
    pub view: Mat4,
}

struct Uniforms {
    mvp: Option<web::WebGlUniformLocation>,
    uv_scale: Option<web::WebGlUniformLocation>,
    color: Option<web::WebGlUniformLocation>,
    use_map: Option<web::WebGlUniformLocation>,
    map: Option<web::WebGlUniformLocation>,
}

struct GlMesh {
    vao: web::WebGlVertexArrayObject,
    _vbo: web::WebGlBuffer,
    _ibo: web::WebGlBuffer,
    index_count: i32,
    texture: Option<web::WebGlTexture>,
}

/// WebGL2 renderer feeding the immersive layer. Lives on its own hidden,
/// XR-compatible canvas since the flat canvas is owned by WebGPU.
pub struct StereoRenderer {
    canvas: web::HtmlCanvasElement,
    gl: Gl,
    program: web::WebGlProgram,
    uniforms: Uniforms,
    white: web::WebGlTexture,
    meshes: FnvHashMap<MeshId, GlMesh>,
}

impl StereoRenderer {
    pub fn new(antialias: bool) -> anyhow::Result<Self> {
        let document =
            crate::dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;
        let canvas: web::HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(js_err)?
            .dyn_into()
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;

        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &"xrCompatible".into(), &JsValue::TRUE).map_err(js_err)?;
        js_sys::Reflect::set(&options, &"antialias".into(), &JsValue::from_bool(antialias))
            .map_err(js_err)?;
        let gl: Gl = canvas
            .get_context_with_context_options("webgl2", &options)
            .map_err(js_err)?
            .ok_or_else(|| anyhow::anyhow!("webgl2 unavailable"))?
            .dyn_into()
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;

        let vert = compile(&gl, Gl::VERTEX_SHADER, cube_core::STEREO_VERT_GLSL)?;
        let frag = compile(&gl, Gl::FRAGMENT_SHADER, cube_core::STEREO_FRAG_GLSL)?;
        let program = link(&gl, &vert, &frag)?;
        let uniforms = Uniforms {
            mvp: gl.get_uniform_location(&program, "u_mvp"),
            uv_scale: gl.get_uniform_location(&program, "u_uv_scale"),
            color: gl.get_uniform_location(&program, "u_color"),
            use_map: gl.get_uniform_location(&program, "u_use_map"),
            map: gl.get_uniform_location(&program, "u_map"),
        };
        let white = upload_texture(&gl, &TextureData::white(), Wrapping::ClampToEdge)?;
        log::info!("[xr] stereo renderer ready");

        Ok(Self {
            canvas,
            gl,
            program,
            uniforms,
            white,
            meshes: FnvHashMap::default(),
        })
    }

    pub fn context(&self) -> &Gl {
        &self.gl
    }

    pub fn set_size(&self, dims: Dimensions) {
        self.canvas.set_width(dims.width);
        self.canvas.set_height(dims.height);
    }

    pub fn render(
        &mut self,
        scene: &Scene,
        framebuffer: Option<&web::WebGlFramebuffer>,
        eyes: &[EyeView],
    ) -> cube_core::Result<()> {
        for mesh in scene.meshes() {
            if !self.meshes.contains_key(&mesh.id) {
                let uploaded = self
                    .upload(mesh)
                    .map_err(|e| WidgetError::Render(format!("{:#}", e)))?;
                self.meshes.insert(mesh.id, uploaded);
            }
        }

        let gl = &self.gl;
        gl.bind_framebuffer(Gl::FRAMEBUFFER, framebuffer);
        let [r, g, b, a] = scene.background.to_rgba();
        gl.clear_color(r, g, b, a);
        gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
        gl.enable(Gl::DEPTH_TEST);
        gl.depth_func(Gl::LESS);
        gl.enable(Gl::CULL_FACE);
        gl.use_program(Some(&self.program));
        gl.active_texture(Gl::TEXTURE0);
        gl.uniform1i(self.uniforms.map.as_ref(), 0);

        for eye in eyes {
            let [x, y, w, h] = eye.viewport;
            gl.viewport(x, y, w, h);
            let view_proj = eye.projection * eye.view;
            for mesh in scene.meshes() {
                let Some(gl_mesh) = self.meshes.get(&mesh.id) else {
                    continue;
                };
                let mvp = view_proj * mesh.model_matrix();
                gl.uniform_matrix4fv_with_f32_array(
                    self.uniforms.mvp.as_ref(),
                    false,
                    &mvp.to_cols_array(),
                );
                gl.uniform4fv_with_f32_array(
                    self.uniforms.color.as_ref(),
                    &mesh.material.color.to_rgba(),
                );
                gl.uniform2fv_with_f32_array(
                    self.uniforms.uv_scale.as_ref(),
                    &mesh.material.uv_scale(),
                );
                gl.uniform1f(
                    self.uniforms.use_map.as_ref(),
                    if gl_mesh.texture.is_some() { 1.0 } else { 0.0 },
                );
                gl.bind_texture(
                    Gl::TEXTURE_2D,
                    Some(gl_mesh.texture.as_ref().unwrap_or(&self.white)),
                );
                gl.cull_face(match mesh.material.side {
                    Side::Front => Gl::BACK,
                    Side::Back => Gl::FRONT,
                });
                gl.bind_vertex_array(Some(&gl_mesh.vao));
                gl.draw_elements_with_i32(Gl::TRIANGLES, gl_mesh.index_count, Gl::UNSIGNED_SHORT, 0);
            }
        }
        gl.bind_vertex_array(None);
        Ok(())
    }

    fn upload(&self, mesh: &Mesh) -> anyhow::Result<GlMesh> {
        let gl = &self.gl;
        let (vertices, indices) = mesh.geometry.build();

        let vao = gl
            .create_vertex_array()
            .ok_or_else(|| anyhow::anyhow!("create_vertex_array failed"))?;
        gl.bind_vertex_array(Some(&vao));

        let vbo = gl
            .create_buffer()
            .ok_or_else(|| anyhow::anyhow!("create_buffer failed"))?;
        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&vbo));
        gl.buffer_data_with_u8_array(
            Gl::ARRAY_BUFFER,
            bytemuck::cast_slice(&vertices),
            Gl::STATIC_DRAW,
        );
        let stride = Vertex::STRIDE as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_with_i32(0, 3, Gl::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_with_i32(1, 2, Gl::FLOAT, false, stride, Vertex::UV_OFFSET as i32);

        let ibo = gl
            .create_buffer()
            .ok_or_else(|| anyhow::anyhow!("create_buffer failed"))?;
        gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&ibo));
        gl.buffer_data_with_u8_array(
            Gl::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&indices),
            Gl::STATIC_DRAW,
        );
        gl.bind_vertex_array(None);

        let texture = match &mesh.material.map {
            Some(map) => Some(upload_texture(gl, &map.texture, map.wrap)?),
            None => None,
        };
        log::debug!("[xr] uploaded {:?} {:?}", mesh.kind, mesh.id);
        Ok(GlMesh {
            vao,
            _vbo: vbo,
            _ibo: ibo,
            index_count: indices.len() as i32,
            texture,
        })
    }
}

fn compile(gl: &Gl, kind: u32, source: &str) -> anyhow::Result<web::WebGlShader> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| anyhow::anyhow!("create_shader failed"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        Err(anyhow::anyhow!(
            "shader compile: {}",
            gl.get_shader_info_log(&shader).unwrap_or_default()
        ))
    }
}

fn link(
    gl: &Gl,
    vert: &web::WebGlShader,
    frag: &web::WebGlShader,
) -> anyhow::Result<web::WebGlProgram> {
    let program = gl
        .create_program()
        .ok_or_else(|| anyhow::anyhow!("create_program failed"))?;
    gl.attach_shader(&program, vert);
    gl.attach_shader(&program, frag);
    gl.link_program(&program);
    if gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        Err(anyhow::anyhow!(
            "program link: {}",
            gl.get_program_info_log(&program).unwrap_or_default()
        ))
    }
}

fn upload_texture(gl: &Gl, data: &TextureData, wrap: Wrapping) -> anyhow::Result<web::WebGlTexture> {
    let texture = gl
        .create_texture()
        .ok_or_else(|| anyhow::anyhow!("create_texture failed"))?;
    gl.bind_texture(Gl::TEXTURE_2D, Some(&texture));
    gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
        Gl::TEXTURE_2D,
        0,
        Gl::RGBA as i32,
        data.width() as i32,
        data.height() as i32,
        0,
        Gl::RGBA,
        Gl::UNSIGNED_BYTE,
        Some(data.rgba()),
    )
    .map_err(js_err)?;
    let mode = match wrap {
        Wrapping::Repeat => Gl::REPEAT,
        Wrapping::ClampToEdge => Gl::CLAMP_TO_EDGE,
    } as i32;
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, mode);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, mode);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);
    Ok(texture)
}
