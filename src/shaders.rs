pub const A_COORDINATES: &str = "a_coordinates";
pub const A_UV: &str = "a_uv";
pub const VERTEX_SHADER_SOURCE: &str = "
	precision highp float;

	attribute vec2 a_coordinates;
	attribute vec2 a_uv;
	varying vec2 v_uv;

	void main() {
	    gl_Position = vec4(a_coordinates, 0.0, 1.0);
	    v_uv = a_uv;
	}
";

pub const MANUAL_FILTERING: &str = "MANUAL_FILTERING";
pub const U_DISSIPATION: &str = "u_dissipation";
pub const U_DELTA_TIME: &str = "u_delta_time";
pub const U_TEXEL_SIZE: &str = "u_texel_size";
pub const U_SOURCE_TEXEL_SIZE: &str = "u_source_texel_size";
pub const U_VELOCITY: &str = "u_velocity";
pub const U_SOURCE: &str = "u_source";
pub const ADVECTION_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform float u_dissipation;
	uniform float u_delta_time;
	uniform vec2 u_texel_size;
	uniform vec2 u_source_texel_size;
	uniform sampler2D u_velocity;
	uniform sampler2D u_source;

	vec4 bilerp(sampler2D sam, vec2 uv, vec2 texel_size) {
	    vec2 st = uv / texel_size - 0.5;
	    vec2 iuv = floor(st);
	    vec2 fuv = fract(st);

	    vec4 a = texture2D(sam, (iuv + vec2(0.5, 0.5)) * texel_size);
	    vec4 b = texture2D(sam, (iuv + vec2(1.5, 0.5)) * texel_size);
	    vec4 c = texture2D(sam, (iuv + vec2(0.5, 1.5)) * texel_size);
	    vec4 d = texture2D(sam, (iuv + vec2(1.5, 1.5)) * texel_size);

	    return mix(mix(a, b, fuv.x), mix(c, d, fuv.x), fuv.y);
	}

	void main() {
	#ifdef MANUAL_FILTERING
	    vec2 position = v_uv - u_delta_time * bilerp(u_velocity, v_uv, u_texel_size).xy * u_texel_size;
	    vec4 result = bilerp(u_source, position, u_source_texel_size);
	#else
	    vec2 position = v_uv - u_delta_time * texture2D(u_velocity, v_uv).xy * u_texel_size;
	    vec4 result = texture2D(u_source, position);
	#endif
	    gl_FragColor = result / (1.0 + u_dissipation * u_delta_time);
	}
";

pub const U_FACTOR: &str = "u_factor";
pub const U_TEXTURE: &str = "u_texture";
pub const COPY_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform float u_factor;
	uniform sampler2D u_texture;

	void main() {
	    gl_FragColor = texture2D(u_texture, v_uv) * u_factor;
	}
";

pub const CURL_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform vec2 u_texel_size;
	uniform sampler2D u_velocity;

	void main() {
	    float x_l = texture2D(u_velocity, v_uv - vec2(u_texel_size.x, 0.0)).y;
	    float x_r = texture2D(u_velocity, v_uv + vec2(u_texel_size.x, 0.0)).y;
	    float x_b = texture2D(u_velocity, v_uv - vec2(0.0, u_texel_size.y)).x;
	    float x_t = texture2D(u_velocity, v_uv + vec2(0.0, u_texel_size.y)).x;

	    float curl = 0.5 * ((x_r - x_l) - (x_t - x_b));
	    gl_FragColor = vec4(curl, 0.0, 0.0, 1.0);
	}
";

pub const U_CURL_STRENGTH: &str = "u_curl_strength";
pub const U_CURL: &str = "u_curl";
pub const VORTICITY_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform float u_curl_strength;
	uniform float u_delta_time;
	uniform vec2 u_texel_size;
	uniform sampler2D u_curl;
	uniform sampler2D u_velocity;

	void main() {
	    float x_l = texture2D(u_curl, v_uv - vec2(u_texel_size.x, 0.0)).x;
	    float x_r = texture2D(u_curl, v_uv + vec2(u_texel_size.x, 0.0)).x;
	    float x_b = texture2D(u_curl, v_uv - vec2(0.0, u_texel_size.y)).x;
	    float x_t = texture2D(u_curl, v_uv + vec2(0.0, u_texel_size.y)).x;
	    float x_c = texture2D(u_curl, v_uv).x;

	    // f = cross(normalize(grad(abs(w))), w), w only has a z-component
	    vec2 force = 0.5 * vec2(abs(x_t) - abs(x_b), abs(x_r) - abs(x_l));
	    force /= length(force) + 0.0001;
	    force *= u_curl_strength * x_c;
	    force.y *= -1.0;

	    vec2 velocity = texture2D(u_velocity, v_uv).xy + force * u_delta_time;
	    velocity = clamp(velocity, -1000.0, 1000.0);
	    gl_FragColor = vec4(velocity, 0.0, 1.0);
	}
";

pub const DIVERGENCE_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform vec2 u_texel_size;
	uniform sampler2D u_velocity;

	void main() {
	    vec2 l = v_uv - vec2(u_texel_size.x, 0.0);
	    vec2 r = v_uv + vec2(u_texel_size.x, 0.0);
	    vec2 b = v_uv - vec2(0.0, u_texel_size.y);
	    vec2 t = v_uv + vec2(0.0, u_texel_size.y);

	    float x_l = texture2D(u_velocity, l).x;
	    float x_r = texture2D(u_velocity, r).x;
	    float x_b = texture2D(u_velocity, b).y;
	    float x_t = texture2D(u_velocity, t).y;
	    vec2 x_c = texture2D(u_velocity, v_uv).xy;

	    if (l.x < 0.0) { x_l = -x_c.x; }
	    if (r.x > 1.0) { x_r = -x_c.x; }
	    if (b.y < 0.0) { x_b = -x_c.y; }
	    if (t.y > 1.0) { x_t = -x_c.y; }

	    float divergence = 0.5 * (x_r - x_l + x_t - x_b);
	    gl_FragColor = vec4(divergence, 0.0, 0.0, 1.0);
	}
";

pub const U_PRESSURE: &str = "u_pressure";
pub const U_DIVERGENCE: &str = "u_divergence";
pub const PRESSURE_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform vec2 u_texel_size;
	uniform sampler2D u_pressure;
	uniform sampler2D u_divergence;

	void main() {
	    float x_l = texture2D(u_pressure, v_uv - vec2(u_texel_size.x, 0.0)).x;
	    float x_r = texture2D(u_pressure, v_uv + vec2(u_texel_size.x, 0.0)).x;
	    float x_b = texture2D(u_pressure, v_uv - vec2(0.0, u_texel_size.y)).x;
	    float x_t = texture2D(u_pressure, v_uv + vec2(0.0, u_texel_size.y)).x;
	    float divergence = texture2D(u_divergence, v_uv).x;

	    float pressure = (x_l + x_r + x_b + x_t - divergence) * 0.25;
	    gl_FragColor = vec4(pressure, 0.0, 0.0, 1.0);
	}
";

pub const GRADIENT_SUBTRACT_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform vec2 u_texel_size;
	uniform sampler2D u_pressure;
	uniform sampler2D u_velocity;

	void main() {
	    float x_l = texture2D(u_pressure, v_uv - vec2(u_texel_size.x, 0.0)).x;
	    float x_r = texture2D(u_pressure, v_uv + vec2(u_texel_size.x, 0.0)).x;
	    float x_b = texture2D(u_pressure, v_uv - vec2(0.0, u_texel_size.y)).x;
	    float x_t = texture2D(u_pressure, v_uv + vec2(0.0, u_texel_size.y)).x;

	    vec2 velocity = texture2D(u_velocity, v_uv).xy;
	    velocity -= vec2(x_r - x_l, x_t - x_b);
	    gl_FragColor = vec4(velocity, 0.0, 1.0);
	}
";

pub const U_TARGET: &str = "u_target";
pub const U_ASPECT_RATIO: &str = "u_aspect_ratio";
pub const U_POINT: &str = "u_point";
pub const U_COLOR: &str = "u_color";
pub const U_RADIUS: &str = "u_radius";
pub const SPLAT_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform float u_aspect_ratio;
	uniform float u_radius;
	uniform vec2 u_point;
	uniform vec3 u_color;
	uniform sampler2D u_target;

	void main() {
	    vec2 distance = v_uv - u_point;
	    distance.x *= u_aspect_ratio;
	    vec3 splat = exp(-dot(distance, distance) / u_radius) * u_color;

	    vec3 base = texture2D(u_target, v_uv).xyz;
	    gl_FragColor = vec4(base + splat, 1.0);
	}
";

pub const SHADING: &str = "SHADING";
pub const DISPLAY_SHADER_SOURCE: &str = "
	precision highp float;
	precision highp sampler2D;

	varying vec2 v_uv;

	uniform vec2 u_texel_size;
	uniform sampler2D u_texture;

	void main() {
	    vec3 color = texture2D(u_texture, v_uv).rgb;

	#ifdef SHADING
	    vec3 x_l = texture2D(u_texture, v_uv - vec2(u_texel_size.x, 0.0)).rgb;
	    vec3 x_r = texture2D(u_texture, v_uv + vec2(u_texel_size.x, 0.0)).rgb;
	    vec3 x_b = texture2D(u_texture, v_uv - vec2(0.0, u_texel_size.y)).rgb;
	    vec3 x_t = texture2D(u_texture, v_uv + vec2(0.0, u_texel_size.y)).rgb;

	    float dx = length(x_r) - length(x_l);
	    float dy = length(x_t) - length(x_b);
	    vec3 normal = normalize(vec3(dx, dy, length(u_texel_size)));
	    float diffuse = clamp(dot(normal, vec3(0.0, 0.0, 1.0)) + 0.7, 0.7, 1.0);
	    color *= diffuse;
	#endif

	    float alpha = max(color.r, max(color.g, color.b));
	    gl_FragColor = vec4(color, alpha);
	}
";
