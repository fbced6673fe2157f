use crossterm::{
    cursor, queue,
    style::{self, Color as CColor},
};
use std::io::{self, Write};

use crate::energy::GameState;
use crate::proximity::ObjectKind;
use crate::sim::Simulation;

// ── Colors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    const fn lerp(a: Rgb, b: Rgb, t_256: u16) -> Rgb {
        let t = t_256 as i32;
        Rgb(
            (a.0 as i32 + (b.0 as i32 - a.0 as i32) * t / 256) as u8,
            (a.1 as i32 + (b.1 as i32 - a.1 as i32) * t / 256) as u8,
            (a.2 as i32 + (b.2 as i32 - a.2 as i32) * t / 256) as u8,
        )
    }

    const fn halved(self) -> Rgb {
        Rgb(self.0 / 2, self.1 / 2, self.2 / 2)
    }

    fn term(self) -> CColor {
        CColor::Rgb {
            r: self.0,
            g: self.1,
            b: self.2,
        }
    }
}

const SKY_TOP: Rgb = Rgb(8, 10, 28);
const SKY_BOT: Rgb = Rgb(24, 30, 64);
const OCTAVE_LINE: Rgb = Rgb(44, 52, 96);
const REFERENCE_LINE: Rgb = Rgb(70, 80, 130);
const TRAIL: Rgb = Rgb(0, 255, 0);
const RING: Rgb = Rgb(255, 255, 255);
const PLANE: Rgb = Rgb(100, 100, 255);
const PLANE_HI: Rgb = Rgb(170, 170, 255);
const BIRD: Rgb = Rgb(0, 220, 230);
const BIRD_WING: Rgb = Rgb(0, 160, 170);
const OWL: Rgb = Rgb(200, 60, 200);
const OWL_EYE: Rgb = Rgb(255, 230, 80);
const BAR_BG: Rgb = Rgb(50, 50, 50);
const BAR_FILL: Rgb = Rgb(255, 0, 0);
const HUD_BG: Rgb = Rgb(0, 0, 0);
const HUD_TEXT: Rgb = Rgb(255, 255, 255);
const HUD_NEARBY: Rgb = Rgb(255, 255, 0);
const HUD_HARMONY: Rgb = Rgb(120, 255, 160);
const WIN: Rgb = Rgb(0, 255, 0);
const LOSE: Rgb = Rgb(255, 0, 0);
const BUTTON: Rgb = Rgb(0, 150, 255);

// ── Pixel buffer with half-block rendering ──────────────────────────────────

/// Text placed over the pixels, in terminal cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub col: u16,
    pub row: u16,
    pub text: String,
    pub fg: Rgb,
    pub bg: Rgb,
}

pub struct PixelBuf {
    w: usize,
    h: usize, // pixel height = terminal rows * 2
    px: Vec<Rgb>,
}

impl PixelBuf {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            px: vec![SKY_TOP; w * h],
        }
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.px.resize(w * h, SKY_TOP);
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    fn set(&mut self, x: i32, y: i32, c: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.px[y as usize * self.w + x as usize] = c;
        }
    }

    fn get(&self, x: usize, y: usize) -> Rgb {
        self.px[y * self.w + x]
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, c: Rgb) {
        for dy in 0..h {
            for dx in 0..w {
                self.set(x + dx, y + dy, c);
            }
        }
    }

    fn line(&mut self, (x0, y0): (i32, i32), (x1, y1): (i32, i32), c: Rgb) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = ((x1 - x0).signum(), (y1 - y0).signum());
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set(x, y, c);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Outline of an axis-aligned ellipse.
    fn ring(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, c: Rgb) {
        let steps = ((rx + ry) * 4.0).max(16.0) as usize;
        for i in 0..steps {
            let a = i as f64 / steps as f64 * std::f64::consts::TAU;
            self.set((cx + rx * a.cos()) as i32, (cy + ry * a.sin()) as i32, c);
        }
    }

    fn darken(&mut self) {
        for c in &mut self.px {
            *c = c.halved();
        }
    }

    pub fn render(&self, out: &mut impl Write, labels: &[Label]) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0))?;
        let rows = self.h / 2;
        let mut fg: Option<Rgb> = None;
        let mut bg: Option<Rgb> = None;

        for row in 0..rows {
            for col in 0..self.w {
                let top = self.get(col, row * 2);
                let bot = self.get(col, row * 2 + 1);

                if bg != Some(bot) {
                    queue!(out, style::SetBackgroundColor(bot.term()))?;
                    bg = Some(bot);
                }
                if top == bot {
                    queue!(out, style::Print(' '))?;
                } else {
                    if fg != Some(top) {
                        queue!(out, style::SetForegroundColor(top.term()))?;
                        fg = Some(top);
                    }
                    queue!(out, style::Print('\u{2580}'))?; // ▀
                }
            }
            if row + 1 < rows {
                queue!(out, style::ResetColor, style::Print("\r\n"))?;
                fg = None;
                bg = None;
            }
        }

        for label in labels {
            queue!(
                out,
                cursor::MoveTo(label.col, label.row),
                style::SetForegroundColor(label.fg.term()),
                style::SetBackgroundColor(label.bg.term()),
                style::Print(&label.text),
            )?;
        }
        queue!(out, style::ResetColor)?;
        out.flush()
    }
}

// ── World to screen ─────────────────────────────────────────────────────────

struct View {
    sx: f64,
    sy: f64,
    camera: f64,
}

impl View {
    fn new(sim: &Simulation, buf: &PixelBuf) -> Self {
        let w = &sim.config().world;
        View {
            sx: buf.width() as f64 / w.width,
            sy: buf.height() as f64 / w.height,
            camera: sim.camera_offset(),
        }
    }

    fn point(&self, x: f64, y: f64) -> (i32, i32) {
        (
            (x * self.sx).round() as i32,
            ((y - self.camera) * self.sy).round() as i32,
        )
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────────

/// Paint one frame into `buf` and return the text that goes over it.
pub fn draw(sim: &Simulation, buf: &mut PixelBuf, frame: u64) -> Vec<Label> {
    let view = View::new(sim, buf);
    draw_sky(sim, buf, &view);
    draw_trail(sim, buf, &view);
    draw_objects(sim, buf, &view, frame);
    draw_plane(sim, buf, &view);
    draw_energy_bar(sim, buf);

    if sim.state().is_over() {
        buf.darken();
        end_screen(sim, buf)
    } else {
        hud(sim)
    }
}

fn draw_sky(sim: &Simulation, buf: &mut PixelBuf, view: &View) {
    let (pw, ph) = (buf.width(), buf.height());
    for y in 0..ph {
        let t = (y * 256 / ph.max(1)) as u16;
        let c = Rgb::lerp(SKY_TOP, SKY_BOT, t);
        for x in 0..pw {
            buf.set(x as i32, y as i32, c);
        }
    }

    // One faint line per octave; the brighter one is the base pitch.
    let cfg = sim.config();
    let octave = cfg.pitch.unit * 7.0;
    let top = view.camera;
    let bottom = top + cfg.world.height;
    let first = ((cfg.reference_y() - bottom) / octave).floor() as i64;
    let last = ((cfg.reference_y() - top) / octave).ceil() as i64;
    for k in first..=last {
        let wy = cfg.reference_y() - k as f64 * octave;
        let (_, y) = view.point(0.0, wy);
        let c = if k == 0 { REFERENCE_LINE } else { OCTAVE_LINE };
        for x in (0..pw as i32).step_by(2) {
            buf.set(x, y, c);
        }
    }
}

fn draw_trail(sim: &Simulation, buf: &mut PixelBuf, view: &View) {
    let points: Vec<_> = sim.trail().iter().map(|&(x, y)| view.point(x, y)).collect();
    for pair in points.windows(2) {
        buf.line(pair[0], pair[1], TRAIL);
    }
}

fn draw_objects(sim: &Simulation, buf: &mut PixelBuf, view: &View, frame: u64) {
    let size = sim.config().spawn.size * 0.6;
    let w = (size * view.sx).max(3.0) as i32;
    let h = (size * view.sy).max(2.0) as i32;
    for obj in sim.objects() {
        let (cx, cy) = view.point(obj.x, obj.y);
        let (x, y) = (cx - w / 2, cy - h / 2);
        match obj.kind {
            ObjectKind::Bird => {
                buf.fill_rect(x, y + h / 3, w, h - h / 3, BIRD);
                let flap = if (frame / 6) % 2 == 0 { 0 } else { h / 3 };
                buf.fill_rect(x + w / 3, y + flap, w / 3, (h / 3).max(1), BIRD_WING);
            }
            ObjectKind::Owl => {
                buf.fill_rect(x, y, w, h, OWL);
                buf.set(x + w / 4, y + h / 3, OWL_EYE);
                buf.set(x + w - 1 - w / 4, y + h / 3, OWL_EYE);
            }
        }
    }
}

fn draw_plane(sim: &Simulation, buf: &mut PixelBuf, view: &View) {
    let p = sim.player();
    let (cx, cy) = view.point(p.x, p.y);

    if !sim.is_listening() {
        let r = sim.config().world.detection_radius;
        buf.ring(cx as f64, cy as f64, r * view.sx, r * view.sy, RING);
    }

    let len = (60.0 * view.sx).max(5.0) as i32;
    let thick = (12.0 * view.sy).max(1.0) as i32;
    buf.fill_rect(cx - len / 2, cy - thick / 2, len, thick, PLANE);
    buf.fill_rect(cx - len / 2, cy - thick / 2, len, 1, PLANE_HI);
    let wing = (len / 3).max(1);
    buf.fill_rect(cx - wing / 2, cy - thick * 2, wing, thick * 4, PLANE);
    buf.fill_rect(cx - len / 2, cy - thick * 2, (len / 8).max(1), thick * 2, PLANE);
}

fn draw_energy_bar(sim: &Simulation, buf: &mut PixelBuf) {
    let pw = buf.width() as i32;
    let e = sim.energy();
    let fill = ((e.score() / e.max()) * pw as f64) as i32;
    buf.fill_rect(0, 0, pw, 2, BAR_BG);
    buf.fill_rect(0, 0, fill, 2, BAR_FILL);
}

fn hud(sim: &Simulation) -> Vec<Label> {
    let freq = sim.frequency();
    let midi = crate::pitch::midi_note(freq);
    let e = sim.energy();
    let goal = if e.is_free_play() {
        "free play".to_string()
    } else {
        format!("{:.1}", e.max())
    };
    let status = format!(
        "MIDI: {midi} | Freq: {freq:.1} Hz | Score: {:.1} / {goal}",
        e.score()
    );

    let report = sim.report();
    let mut nearby = format!("Nearby ({}): ", report.total());
    if report.counts.is_empty() {
        nearby.push_str("None");
    } else {
        let parts: Vec<_> = report
            .counts
            .iter()
            .map(|(kind, n)| format!("{}: {n}", kind.label()))
            .collect();
        nearby.push_str(&parts.join(", "));
        nearby.push_str(&format!(" | Score Change: {:.2}", report.delta));
    }

    let mut labels = vec![
        Label {
            col: 1,
            row: 1,
            text: status,
            fg: HUD_TEXT,
            bg: HUD_BG,
        },
        Label {
            col: 1,
            row: 2,
            text: nearby,
            fg: HUD_NEARBY,
            bg: HUD_BG,
        },
    ];

    let harmony = sim.voices().harmony();
    if !harmony.is_empty() {
        let freqs: Vec<_> = harmony.iter().map(|h| format!("{:.1}", h.frequency)).collect();
        labels.push(Label {
            col: 1,
            row: 3,
            text: format!("Harmony: {} Hz", freqs.join(", ")),
            fg: HUD_HARMONY,
            bg: HUD_BG,
        });
    }
    labels
}

fn centered(buf: &PixelBuf, row: i32, text: String, fg: Rgb, bg: Rgb) -> Label {
    let cols = buf.width() as i32;
    let col = ((cols - text.chars().count() as i32) / 2).max(0);
    Label {
        col: col as u16,
        row: row.max(0) as u16,
        text,
        fg,
        bg,
    }
}

fn end_screen(sim: &Simulation, buf: &mut PixelBuf) -> Vec<Label> {
    let rows = (buf.height() / 2) as i32;
    let mid = rows / 2;
    let (title, color) = match sim.state() {
        GameState::Win => ("SUCCESS! Mission Accomplished", WIN),
        _ => ("GAME OVER", LOSE),
    };

    let mut labels = vec![centered(buf, mid - 4, title.to_string(), color, HUD_BG)];
    if sim.state() == GameState::Win {
        let t = sim.elapsed();
        let text = format!("Time: {:02}m {:02}s", (t / 60.0) as u64, (t % 60.0) as u64);
        labels.push(centered(buf, mid - 2, text, HUD_TEXT, HUD_BG));
    }

    let w = (buf.width() as i32).min(20);
    let x = (buf.width() as i32 - w) / 2;
    buf.fill_rect(x, (mid + 1) * 2, w, 6, BUTTON);
    labels.push(centered(buf, mid + 2, " RESTART (R) ".to_string(), HUD_TEXT, BUTTON));
    labels
}
